//! The Shed state machine.
//!
//! The engine is externally driven. Whoever owns it alternates between two
//! calls:
//!
//! - [`Shed::next`] when nothing is awaited: produces the next prompts and
//!   records which command it now waits for.
//! - [`Shed::receive_response`] with the player's answer to that command.
//!
//! Both return the batch of [`OutboundMessage`]s to deliver. Every message
//! carries the recipient's complete view of the table.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shed_protocol::{Card, Command, InboundMessage, Opponent, OutboundMessage, PlayerId, PlayerInfo};
use tracing::debug;

use crate::deck::Deck;
use crate::error::GameError;
use crate::player_cards::{CardGroup, GROUP_SIZE, PlayerCards};
use crate::rules;
use crate::state::{PlayState, Stage};

/// Fewest players a game can start with.
pub const MIN_PLAYERS: usize = 2;
/// Most players a game can start with.
pub const MAX_PLAYERS: usize = 4;

/// One game of Shed.
///
/// Players are addressed by their seat, the index into the join-order
/// list passed to [`start`](Self::start). `active` and `finished` hold
/// seats; `current_turn` indexes `active`.
#[derive(Debug)]
pub struct Shed {
    rng: StdRng,
    players: Vec<PlayerInfo>,
    cards: Vec<PlayerCards>,
    active: Vec<usize>,
    finished: Vec<usize>,
    current_turn: usize,
    deck: Deck,
    pile: Vec<Card>,
    stage: Stage,
    play_state: PlayState,
    awaited: Command,
    /// Face-down index chosen by a blind play, until its ack.
    pending_unseen: Option<usize>,
}

impl Shed {
    /// An idle game seeded from the operating system.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// An idle game whose shuffle and first player are fixed by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            players: Vec::new(),
            cards: Vec::new(),
            active: Vec::new(),
            finished: Vec::new(),
            current_turn: 0,
            deck: Deck::from_cards(Vec::new()),
            pile: Vec::new(),
            stage: Stage::PreGame,
            play_state: PlayState::Idle,
            awaited: Command::Null,
            pending_unseen: None,
        }
    }

    // -- Accessors --

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    /// The command the engine accepts next; `Null` when `next` should be
    /// called instead.
    pub fn awaited_command(&self) -> Command {
        self.awaited
    }

    pub fn current_turn_index(&self) -> usize {
        self.current_turn
    }

    /// The player whose turn it is, if the game is in progress.
    pub fn current_player(&self) -> Option<&PlayerInfo> {
        self.current_seat().map(|seat| &self.players[seat])
    }

    /// Every seated player in join order.
    pub fn players(&self) -> &[PlayerInfo] {
        &self.players
    }

    /// Players still competing, in turn order.
    pub fn active_players(&self) -> Vec<&PlayerInfo> {
        self.active.iter().map(|&s| &self.players[s]).collect()
    }

    /// Players who have emptied their cards, first place first.
    pub fn finished_players(&self) -> Vec<&PlayerInfo> {
        self.finished.iter().map(|&s| &self.players[s]).collect()
    }

    pub fn pile(&self) -> &[Card] {
        &self.pile
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn player_cards(&self, id: &PlayerId) -> Option<&PlayerCards> {
        self.seat_of(id).map(|seat| &self.cards[seat])
    }

    // -- Lifecycle --

    /// Seats `players`, shuffles and deals.
    ///
    /// Each player is dealt three face-down, three face-up and three hand
    /// cards, and the first player is drawn at random. Returns the
    /// `HasStarted` broadcast. Calling this on a game that has already
    /// started does nothing and returns an empty batch.
    pub fn start(&mut self, players: Vec<PlayerInfo>) -> Result<Vec<OutboundMessage>, GameError> {
        if self.play_state != PlayState::Idle {
            return Ok(Vec::new());
        }
        if players.len() < MIN_PLAYERS {
            return Err(GameError::TooFewPlayers {
                min: MIN_PLAYERS,
                got: players.len(),
            });
        }
        if players.len() > MAX_PLAYERS {
            return Err(GameError::TooManyPlayers {
                max: MAX_PLAYERS,
                got: players.len(),
            });
        }
        for (i, p) in players.iter().enumerate() {
            if players[..i].iter().any(|q| q.id == p.id) {
                return Err(GameError::DuplicatePlayer(p.id.clone()));
            }
        }

        let mut deck = Deck::shuffled(&mut self.rng);
        let mut cards = Vec::with_capacity(players.len());
        for _ in &players {
            let unseen = deck.deal(GROUP_SIZE);
            let seen = deck.deal(GROUP_SIZE);
            let hand = deck.deal(GROUP_SIZE);
            cards.push(PlayerCards::new(hand, seen, unseen)?);
        }

        self.current_turn = self.rng.random_range(0..players.len());
        self.active = (0..players.len()).collect();
        self.finished.clear();
        self.players = players;
        self.cards = cards;
        self.deck = deck;
        self.pile.clear();
        self.stage = Stage::PreGame;
        self.play_state = PlayState::InProgress;
        self.awaited = Command::Null;
        self.pending_unseen = None;

        debug!(
            players = self.players.len(),
            first = %self.players[self.active[self.current_turn]].id,
            "game started"
        );

        Ok(self.to_all(Command::HasStarted, "The game has started"))
    }

    /// Produces the next prompts. Only valid while nothing is awaited.
    pub fn next(&mut self) -> Result<Vec<OutboundMessage>, GameError> {
        match self.play_state {
            PlayState::Idle => return Err(GameError::NotStarted),
            PlayState::Over => return Ok(self.game_over_messages()),
            PlayState::InProgress => {}
        }
        if self.awaited != Command::Null {
            return Err(GameError::AwaitingResponse(self.awaited));
        }
        if self.stage == Stage::ClearDeck && self.deck.is_empty() {
            self.stage = Stage::ClearCards;
        }

        let seat = self.require_current()?;
        let batch = match self.stage {
            Stage::PreGame => {
                self.awaited = Command::Reorg;
                self.reorg_prompts()
            }
            Stage::ClearDeck => self.offer_group(seat, CardGroup::Hand),
            Stage::ClearCards => {
                let cards = &self.cards[seat];
                let (has_hand, has_seen, has_unseen) = (
                    !cards.hand().is_empty(),
                    !cards.seen().is_empty(),
                    !cards.unseen().is_empty(),
                );
                if has_hand {
                    self.offer_group(seat, CardGroup::Hand)
                } else if has_seen {
                    self.offer_group(seat, CardGroup::Seen)
                } else if has_unseen {
                    self.offer_unseen(seat)
                } else {
                    self.announce_finished(seat)
                }
            }
        };

        debug!(stage = %self.stage, awaited = %self.awaited, "next");
        Ok(batch)
    }

    /// Feeds the players' answer to the awaited command into the game.
    ///
    /// During pre-game reorganisation `messages` must hold exactly one
    /// message per player; otherwise exactly one message from the current
    /// player. On error nothing changes; see
    /// [`rejection_messages`](Self::rejection_messages) for what to tell
    /// the players.
    pub fn receive_response(
        &mut self,
        messages: &[InboundMessage],
    ) -> Result<Vec<OutboundMessage>, GameError> {
        match self.play_state {
            PlayState::Idle => return Err(GameError::NotStarted),
            PlayState::Over => return Ok(self.game_over_messages()),
            PlayState::InProgress => {}
        }
        if self.awaited == Command::Null {
            return Err(GameError::UnexpectedResponse);
        }
        if self.awaited == Command::Reorg {
            return self.apply_reorgs(messages);
        }

        let [msg] = messages else {
            return Err(GameError::ResponseCount {
                expected: 1,
                got: messages.len(),
            });
        };
        let seat = self
            .seat_of(&msg.player_id)
            .ok_or_else(|| GameError::UnknownPlayer(msg.player_id.clone()))?;
        if Some(seat) != self.current_seat() {
            return Err(GameError::NotYourTurn {
                player: msg.player_id.clone(),
            });
        }
        if msg.command != self.awaited {
            return Err(GameError::UnexpectedCommand {
                player: msg.player_id.clone(),
                expected: self.awaited,
                got: msg.command,
            });
        }

        debug!(player_id = %msg.player_id, command = %msg.command, "response");

        match msg.command {
            Command::SkipTurn | Command::EndOfTurn => {
                self.end_turn();
                Ok(Vec::new())
            }
            Command::ReplenishHand => {
                if self.deck.is_empty() {
                    self.stage = Stage::ClearCards;
                }
                self.end_turn();
                Ok(Vec::new())
            }
            Command::Burn => {
                self.pile.clear();
                self.awaited = Command::Null;
                if self.stage == Stage::ClearDeck && self.deck.is_empty() {
                    self.stage = Stage::ClearCards;
                }
                if self.cards[seat].is_empty() {
                    return Ok(self.announce_finished(seat));
                }
                Ok(Vec::new())
            }
            Command::PlayHand => self.play_group(seat, CardGroup::Hand, &msg.decision),
            Command::PlaySeen => self.play_group(seat, CardGroup::Seen, &msg.decision),
            Command::PlayUnseen => self.play_unseen(seat, &msg.decision),
            Command::UnseenSuccess => {
                let card = self.finish_unseen(seat)?;
                self.pile.push(card);
                if rules::is_burn(&self.pile) {
                    return Ok(self.announce_burn(seat));
                }
                if self.cards[seat].is_empty() {
                    return Ok(self.announce_finished(seat));
                }
                self.end_turn();
                Ok(Vec::new())
            }
            Command::UnseenFailure => {
                let card = self.finish_unseen(seat)?;
                self.pile.push(card);
                self.pick_up_pile(seat);
                self.end_turn();
                Ok(Vec::new())
            }
            Command::PlayerFinished => Ok(self.retire(seat)),
            Command::Null
            | Command::NewJoiner
            | Command::Reorg
            | Command::Start
            | Command::HasStarted
            | Command::Error
            | Command::Turn
            | Command::GameOver => Err(GameError::UnexpectedResponse),
        }
    }

    /// The `Error` messages that tell players about a rejected response
    /// from `offender`.
    ///
    /// An invalid move is announced to everyone; routing mistakes and a
    /// bad blind play only to the offender. Errors no player caused
    /// produce nothing.
    pub fn rejection_messages(&self, err: &GameError, offender: &PlayerId) -> Vec<OutboundMessage> {
        let text = err.to_string();
        match err {
            GameError::InvalidMove => (0..self.players.len())
                .map(|seat| self.error_for(seat, &text))
                .collect(),
            GameError::NotYourTurn { .. }
            | GameError::UnexpectedCommand { .. }
            | GameError::UnknownPlayer(_)
            | GameError::InvalidReorg(_)
            | GameError::PlayOneCard
            | GameError::ResponseCount { .. }
            | GameError::DuplicatePlayer(_) => match self.seat_of(offender) {
                Some(seat) => vec![self.error_for(seat, &text)],
                None => vec![OutboundMessage::error(offender.clone(), text)],
            },
            GameError::TooFewPlayers { .. }
            | GameError::TooManyPlayers { .. }
            | GameError::NotStarted
            | GameError::UnexpectedResponse
            | GameError::AwaitingResponse(_)
            | GameError::InvalidCards(_) => Vec::new(),
        }
    }

    /// Checks one player's reorganisation on its own, without applying it.
    ///
    /// Lets a driver reject a bad choice from one player while it keeps
    /// collecting everyone else's.
    pub fn validate_reorg(&self, msg: &InboundMessage) -> Result<(), GameError> {
        match self.play_state {
            PlayState::Idle => return Err(GameError::NotStarted),
            PlayState::Over => return Err(GameError::UnexpectedResponse),
            PlayState::InProgress => {}
        }
        if self.awaited != Command::Reorg {
            return Err(GameError::UnexpectedCommand {
                player: msg.player_id.clone(),
                expected: self.awaited,
                got: msg.command,
            });
        }
        self.reorganised(msg).map(|_| ())
    }

    // -- Transitions --

    /// The seat of `msg`'s sender and their cards after its reorganisation.
    fn reorganised(&self, msg: &InboundMessage) -> Result<(usize, PlayerCards), GameError> {
        let seat = self
            .seat_of(&msg.player_id)
            .ok_or_else(|| GameError::UnknownPlayer(msg.player_id.clone()))?;
        if msg.command != Command::Reorg {
            return Err(GameError::UnexpectedCommand {
                player: msg.player_id.clone(),
                expected: Command::Reorg,
                got: msg.command,
            });
        }
        let mut cards = self.cards[seat].clone();
        cards
            .reorganise(&msg.decision)
            .map_err(|_| GameError::InvalidReorg(msg.player_id.clone()))?;
        Ok((seat, cards))
    }

    fn apply_reorgs(&mut self, messages: &[InboundMessage]) -> Result<Vec<OutboundMessage>, GameError> {
        if messages.len() != self.players.len() {
            return Err(GameError::ResponseCount {
                expected: self.players.len(),
                got: messages.len(),
            });
        }

        // Validate every decision against a copy before touching anything.
        let mut reorganised = self.cards.clone();
        let mut answered = vec![false; self.players.len()];
        for msg in messages {
            let (seat, cards) = self.reorganised(msg)?;
            if std::mem::replace(&mut answered[seat], true) {
                return Err(GameError::DuplicatePlayer(msg.player_id.clone()));
            }
            reorganised[seat] = cards;
        }

        self.cards = reorganised;
        self.stage = Stage::ClearDeck;
        self.awaited = Command::Null;
        debug!("all players reorganised");
        Ok(Vec::new())
    }

    fn play_group(
        &mut self,
        seat: usize,
        group: CardGroup,
        decision: &[usize],
    ) -> Result<Vec<OutboundMessage>, GameError> {
        let legal = rules::legal_moves(&self.pile, self.cards[seat].group(group));
        self.cards[seat].select(group, decision)?;
        if decision.iter().any(|i| !legal.contains(i)) {
            return Err(GameError::InvalidMove);
        }

        let played = self.cards[seat].take(group, decision)?;
        let name = self.players[seat].name.clone();
        let text = describe_play(&name, &played);
        self.pile.extend(played);

        if self.stage == Stage::ClearDeck {
            let hand_len = self.cards[seat].hand().len();
            if hand_len < GROUP_SIZE && !self.deck.is_empty() {
                let wanted = (GROUP_SIZE - hand_len).min(decision.len());
                let drawn = self.deck.deal(wanted);
                self.cards[seat].add_to_hand(drawn);
            }
        }

        if rules::is_burn(&self.pile) {
            return Ok(self.announce_burn(seat));
        }

        match self.stage {
            Stage::ClearDeck => {
                self.awaited = Command::ReplenishHand;
                Ok(self.to_current(seat, Command::ReplenishHand, Command::EndOfTurn, &text, None))
            }
            _ if self.cards[seat].is_empty() => Ok(self.announce_finished(seat)),
            _ => {
                self.awaited = Command::EndOfTurn;
                Ok(self.to_current(seat, Command::EndOfTurn, Command::EndOfTurn, &text, None))
            }
        }
    }

    fn play_unseen(&mut self, seat: usize, decision: &[usize]) -> Result<Vec<OutboundMessage>, GameError> {
        let &[index] = decision else {
            return Err(GameError::PlayOneCard);
        };
        let card = self.cards[seat].reveal_unseen(index)?;
        self.pending_unseen = Some(index);

        let name = &self.players[seat].name;
        let (command, text) = if rules::can_play(&self.pile, card) {
            (Command::UnseenSuccess, format!("{name} turned over {card} and can play it"))
        } else {
            (Command::UnseenFailure, format!("{name} turned over {card} and must pick up"))
        };
        self.awaited = command;
        Ok(self.to_current(seat, command, command, &text, None))
    }

    fn finish_unseen(&mut self, seat: usize) -> Result<Card, GameError> {
        let index = self.pending_unseen.ok_or(GameError::UnexpectedResponse)?;
        let card = self.cards[seat].take_unseen(index)?;
        self.pending_unseen = None;
        Ok(card)
    }

    /// Offers a play from `group`, or makes the player pick up the pile if
    /// nothing in it can be played.
    fn offer_group(&mut self, seat: usize, group: CardGroup) -> Vec<OutboundMessage> {
        let moves = rules::legal_moves(&self.pile, self.cards[seat].group(group));
        let name = self.players[seat].name.clone();
        if moves.is_empty() {
            self.pick_up_pile(seat);
            self.awaited = Command::SkipTurn;
            let text = format!("{name} cannot play and picks up the pile");
            return self.to_current(seat, Command::SkipTurn, Command::SkipTurn, &text, None);
        }

        let prompt = match group {
            CardGroup::Hand => Command::PlayHand,
            CardGroup::Seen => Command::PlaySeen,
        };
        self.awaited = prompt;
        let text = format!("{name}'s turn");
        self.to_current(seat, prompt, Command::Turn, &text, Some(moves))
    }

    /// Blind play: every face-down index is offered.
    fn offer_unseen(&mut self, seat: usize) -> Vec<OutboundMessage> {
        let moves = (0..self.cards[seat].unseen().len()).collect();
        self.awaited = Command::PlayUnseen;
        let text = format!("{}'s turn", self.players[seat].name);
        self.to_current(seat, Command::PlayUnseen, Command::Turn, &text, Some(moves))
    }

    fn announce_burn(&mut self, seat: usize) -> Vec<OutboundMessage> {
        self.awaited = Command::Burn;
        let text = format!("{} burned the pile", self.players[seat].name);
        self.to_current(seat, Command::Burn, Command::Burn, &text, None)
    }

    fn announce_finished(&mut self, seat: usize) -> Vec<OutboundMessage> {
        self.awaited = Command::PlayerFinished;
        let text = format!("{} has finished", self.players[seat].name);
        self.to_current(seat, Command::PlayerFinished, Command::PlayerFinished, &text, None)
    }

    /// Moves the current player from active to finished. Ends the game
    /// once one player is left.
    fn retire(&mut self, seat: usize) -> Vec<OutboundMessage> {
        self.active.retain(|&s| s != seat);
        self.finished.push(seat);
        self.awaited = Command::Null;

        if self.active.len() <= 1 {
            self.finished.append(&mut self.active);
            self.current_turn = 0;
            self.play_state = PlayState::Over;
            debug!("game over");
            return self.game_over_messages();
        }
        // The removed slot is now held by the next player.
        if self.current_turn >= self.active.len() {
            self.current_turn = 0;
        }
        Vec::new()
    }

    fn end_turn(&mut self) {
        self.awaited = Command::Null;
        if !self.active.is_empty() {
            self.current_turn = (self.current_turn + 1) % self.active.len();
        }
    }

    fn pick_up_pile(&mut self, seat: usize) {
        let pile = std::mem::take(&mut self.pile);
        self.cards[seat].add_to_hand(pile);
    }

    // -- Seats --

    fn seat_of(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == id)
    }

    fn current_seat(&self) -> Option<usize> {
        if self.play_state != PlayState::InProgress {
            return None;
        }
        self.active.get(self.current_turn).copied()
    }

    fn require_current(&self) -> Result<usize, GameError> {
        self.current_seat().ok_or(GameError::NotStarted)
    }

    // -- Message building --

    /// A message to `seat` carrying their full view of the table.
    fn view(&self, seat: usize, command: Command, text: &str) -> OutboundMessage {
        let me = &self.players[seat];
        let snapshot = self.cards[seat].snapshot();
        let opponents = self
            .players
            .iter()
            .zip(&self.cards)
            .enumerate()
            .filter(|&(s, _)| s != seat)
            .map(|(_, (p, cards))| Opponent {
                id: p.id.clone(),
                name: p.name.clone(),
                seen: cards.seen().to_vec(),
            })
            .collect();

        OutboundMessage {
            name: me.name.clone(),
            message: text.to_string(),
            hand: snapshot.hand,
            seen: snapshot.seen,
            unseen: snapshot.unseen,
            pile: self.pile.clone(),
            deck_count: self.deck.len(),
            current_turn: self.current_player().cloned(),
            opponents: Some(opponents),
            finished_players: (!self.finished.is_empty())
                .then(|| self.finished_players().into_iter().cloned().collect()),
            ..OutboundMessage::new(me.id.clone(), command)
        }
    }

    fn error_for(&self, seat: usize, text: &str) -> OutboundMessage {
        OutboundMessage {
            error: Some(text.to_string()),
            ..self.view(seat, Command::Error, text)
        }
    }

    fn to_all(&self, command: Command, text: &str) -> Vec<OutboundMessage> {
        (0..self.players.len())
            .map(|seat| self.view(seat, command, text))
            .collect()
    }

    /// `prompt` to the current player, who must answer it; `others` to
    /// everyone else.
    fn to_current(
        &self,
        current: usize,
        prompt: Command,
        others: Command,
        text: &str,
        moves: Option<Vec<usize>>,
    ) -> Vec<OutboundMessage> {
        (0..self.players.len())
            .map(|seat| {
                if seat == current {
                    OutboundMessage {
                        should_respond: true,
                        moves: moves.clone(),
                        ..self.view(seat, prompt, text)
                    }
                } else {
                    self.view(seat, others, text)
                }
            })
            .collect()
    }

    fn reorg_prompts(&self) -> Vec<OutboundMessage> {
        (0..self.players.len())
            .map(|seat| {
                let cards = &self.cards[seat];
                let moves = (0..cards.hand().len() + cards.seen().len()).collect();
                OutboundMessage {
                    should_respond: true,
                    moves: Some(moves),
                    ..self.view(seat, Command::Reorg, "Choose the three cards for your hand")
                }
            })
            .collect()
    }

    fn game_over_messages(&self) -> Vec<OutboundMessage> {
        let text = match self.finished.first() {
            Some(&winner) => format!("Game over: {} went out first", self.players[winner].name),
            None => "Game over".to_string(),
        };
        self.to_all(Command::GameOver, &text)
    }
}

impl Default for Shed {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_play(name: &str, played: &[Card]) -> String {
    let cards: Vec<String> = played.iter().map(Card::to_string).collect();
    format!("{name} played {}", cards.join(" "))
}

#[cfg(test)]
mod tests {
    use shed_protocol::{Rank, Suit};

    use super::*;

    fn c(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    fn two_players() -> Vec<PlayerInfo> {
        vec![PlayerInfo::new("p1", "Alice"), PlayerInfo::new("p2", "Bob")]
    }

    fn three_players() -> Vec<PlayerInfo> {
        vec![
            PlayerInfo::new("p1", "Alice"),
            PlayerInfo::new("p2", "Bob"),
            PlayerInfo::new("p3", "Carol"),
        ]
    }

    /// A started game rearranged into a hand-built position. Player 1 is
    /// current; leftover cards go back into the deck so every card is
    /// still accounted for.
    fn staged(
        stage: Stage,
        pile: Vec<Card>,
        current: PlayerCards,
        deck_len: usize,
    ) -> Shed {
        let mut game = Shed::with_seed(1);
        game.start(two_players()).unwrap();

        let mut rest: Vec<Card> = Deck::new()
            .cards()
            .iter()
            .copied()
            .filter(|card| !pile.contains(card) && !current.cards().any(|c| c == *card))
            .collect();
        let other_hand = rest.split_off(rest.len() - 3);
        let other_seen = rest.split_off(rest.len() - 3);
        let other_unseen = rest.split_off(rest.len() - 3);
        let spare = rest.split_off(rest.len() - deck_len.min(rest.len()));

        game.cards = vec![
            current,
            PlayerCards::new(other_hand, other_seen, other_unseen).unwrap(),
        ];
        game.deck = Deck::from_cards(spare);
        game.pile = pile;
        game.stage = stage;
        game.current_turn = 0;
        game.awaited = Command::Null;
        game
    }

    fn respond(game: &mut Shed, id: &str, command: Command, decision: Vec<usize>) -> Vec<OutboundMessage> {
        game.receive_response(&[InboundMessage::new(id, command).with_decision(decision)])
            .unwrap()
    }

    fn for_player<'a>(batch: &'a [OutboundMessage], id: &str) -> &'a OutboundMessage {
        batch
            .iter()
            .find(|m| m.player_id.as_str() == id)
            .expect("message for player")
    }

    // -- start --

    #[test]
    fn test_start_too_few_players_rejected() {
        let mut game = Shed::with_seed(1);
        let err = game.start(vec![PlayerInfo::new("p1", "Alice")]).unwrap_err();
        assert_eq!(err, GameError::TooFewPlayers { min: 2, got: 1 });
        assert_eq!(game.play_state(), PlayState::Idle);
    }

    #[test]
    fn test_start_too_many_players_rejected() {
        let mut game = Shed::with_seed(1);
        let players = (1..=5).map(|i| PlayerInfo::new(format!("p{i}"), "x")).collect();
        assert_eq!(
            game.start(players).unwrap_err(),
            GameError::TooManyPlayers { max: 4, got: 5 }
        );
    }

    #[test]
    fn test_start_duplicate_player_rejected() {
        let mut game = Shed::with_seed(1);
        let players = vec![PlayerInfo::new("p1", "Alice"), PlayerInfo::new("p1", "Again")];
        assert!(matches!(game.start(players), Err(GameError::DuplicatePlayer(_))));
    }

    #[test]
    fn test_start_deals_nine_cards_each() {
        let mut game = Shed::with_seed(3);
        let batch = game.start(three_players()).unwrap();

        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(|m| m.command == Command::HasStarted));
        assert_eq!(game.deck().len(), 52 - 27);
        for p in three_players() {
            let cards = game.player_cards(&p.id).unwrap();
            assert_eq!((cards.hand().len(), cards.seen().len(), cards.unseen().len()), (3, 3, 3));
        }
        assert_eq!(game.stage(), Stage::PreGame);
        assert_eq!(game.play_state(), PlayState::InProgress);
        assert_eq!(game.awaited_command(), Command::Null);
        assert!(game.current_turn_index() < 3);
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut game = Shed::with_seed(3);
        game.start(two_players()).unwrap();
        let deck_before = game.deck().clone();
        assert!(game.start(three_players()).unwrap().is_empty());
        assert_eq!(game.players().len(), 2);
        assert_eq!(game.deck(), &deck_before);
    }

    #[test]
    fn test_start_first_player_can_be_last_seat() {
        let picked_last = (0..64).any(|seed| {
            let mut game = Shed::with_seed(seed);
            game.start(two_players()).unwrap();
            game.current_turn_index() == 1
        });
        assert!(picked_last);
    }

    // -- protocol discipline --

    #[test]
    fn test_next_before_start_is_not_started() {
        let mut game = Shed::with_seed(1);
        assert_eq!(game.next().unwrap_err(), GameError::NotStarted);
    }

    #[test]
    fn test_next_while_awaiting_is_error() {
        let mut game = Shed::with_seed(1);
        game.start(two_players()).unwrap();
        game.next().unwrap();
        assert_eq!(
            game.next().unwrap_err(),
            GameError::AwaitingResponse(Command::Reorg)
        );
    }

    #[test]
    fn test_receive_response_when_nothing_awaited_is_error() {
        let mut game = Shed::with_seed(1);
        game.start(two_players()).unwrap();
        let msg = InboundMessage::new("p1", Command::PlayHand);
        assert_eq!(
            game.receive_response(&[msg]).unwrap_err(),
            GameError::UnexpectedResponse
        );
    }

    // -- S6: pre-game reorganisation --

    #[test]
    fn test_reorg_waits_for_every_player() {
        let mut game = Shed::with_seed(9);
        game.start(three_players()).unwrap();

        let prompts = game.next().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|m| m.command == Command::Reorg && m.should_respond));
        assert_eq!(game.awaited_command(), Command::Reorg);

        let partial: Vec<_> = ["p1", "p2"]
            .iter()
            .map(|id| InboundMessage::new(*id, Command::Reorg).with_decision(vec![0, 1, 2]))
            .collect();
        assert_eq!(
            game.receive_response(&partial).unwrap_err(),
            GameError::ResponseCount { expected: 3, got: 2 }
        );
        assert_eq!(game.stage(), Stage::PreGame);

        let all: Vec<_> = ["p1", "p2", "p3"]
            .iter()
            .map(|id| InboundMessage::new(*id, Command::Reorg).with_decision(vec![3, 4, 5]))
            .collect();
        let before = game.player_cards(&PlayerId::from("p2")).unwrap().seen().to_vec();
        assert!(game.receive_response(&all).unwrap().is_empty());
        assert_eq!(game.stage(), Stage::ClearDeck);
        assert_eq!(game.awaited_command(), Command::Null);
        assert_eq!(game.player_cards(&PlayerId::from("p2")).unwrap().hand(), &before[..]);
    }

    #[test]
    fn test_reorg_bad_decision_changes_nothing() {
        let mut game = Shed::with_seed(9);
        game.start(two_players()).unwrap();
        game.next().unwrap();
        let snapshot = game.cards.clone();

        let batch = vec![
            InboundMessage::new("p1", Command::Reorg).with_decision(vec![3, 4, 5]),
            InboundMessage::new("p2", Command::Reorg).with_decision(vec![0, 0, 1]),
        ];
        assert_eq!(
            game.receive_response(&batch).unwrap_err(),
            GameError::InvalidReorg(PlayerId::from("p2"))
        );
        assert_eq!(game.cards, snapshot);
        assert_eq!(game.awaited_command(), Command::Reorg);
    }

    #[test]
    fn test_validate_reorg_checks_one_player() {
        let mut game = Shed::with_seed(9);
        game.start(two_players()).unwrap();
        game.next().unwrap();
        let snapshot = game.cards.clone();

        let good = InboundMessage::new("p1", Command::Reorg).with_decision(vec![3, 4, 5]);
        assert_eq!(game.validate_reorg(&good), Ok(()));

        let bad = InboundMessage::new("p2", Command::Reorg).with_decision(vec![0, 0, 1]);
        let err = game.validate_reorg(&bad).unwrap_err();
        assert_eq!(err, GameError::InvalidReorg(PlayerId::from("p2")));
        assert_eq!(game.cards, snapshot);

        let rejections = game.rejection_messages(&err, &PlayerId::from("p2"));
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].player_id, PlayerId::from("p2"));
        assert_eq!(rejections[0].command, Command::Error);
    }

    #[test]
    fn test_validate_reorg_outside_pre_game_is_rejected() {
        let mut game = Shed::with_seed(9);
        let msg = InboundMessage::new("p1", Command::Reorg).with_decision(vec![0, 1, 2]);
        assert_eq!(game.validate_reorg(&msg), Err(GameError::NotStarted));

        game.start(two_players()).unwrap();
        assert_eq!(
            game.validate_reorg(&msg),
            Err(GameError::UnexpectedCommand {
                player: PlayerId::from("p1"),
                expected: Command::Null,
                got: Command::Reorg,
            })
        );
    }

    // -- routing --

    #[test]
    fn test_receive_response_wrong_player_is_rejected() {
        let mut game = staged(
            Stage::ClearDeck,
            vec![],
            PlayerCards::new(vec![c(Rank::Four, Suit::Clubs)], vec![], vec![]).unwrap(),
            10,
        );
        game.next().unwrap();

        let msg = InboundMessage::new("p2", Command::PlayHand).with_decision(vec![0]);
        let err = game.receive_response(&[msg]).unwrap_err();
        assert_eq!(err, GameError::NotYourTurn { player: PlayerId::from("p2") });

        let rejections = game.rejection_messages(&err, &PlayerId::from("p2"));
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].player_id.as_str(), "p2");
        assert_eq!(rejections[0].command, Command::Error);
        assert!(rejections[0].error.is_some());
        assert_eq!(game.awaited_command(), Command::PlayHand);
    }

    #[test]
    fn test_receive_response_wrong_command_is_rejected() {
        let mut game = staged(
            Stage::ClearDeck,
            vec![],
            PlayerCards::new(vec![c(Rank::Four, Suit::Clubs)], vec![], vec![]).unwrap(),
            10,
        );
        game.next().unwrap();

        let msg = InboundMessage::new("p1", Command::PlaySeen).with_decision(vec![0]);
        assert_eq!(
            game.receive_response(&[msg]).unwrap_err(),
            GameError::UnexpectedCommand {
                player: PlayerId::from("p1"),
                expected: Command::PlayHand,
                got: Command::PlaySeen,
            }
        );
    }

    #[test]
    fn test_play_hand_mixed_ranks_is_invalid_move_for_all() {
        let mut game = staged(
            Stage::ClearDeck,
            vec![],
            PlayerCards::new(
                vec![c(Rank::Four, Suit::Clubs), c(Rank::Five, Suit::Clubs)],
                vec![],
                vec![],
            )
            .unwrap(),
            10,
        );
        game.next().unwrap();
        let pile_before = game.pile().to_vec();

        let msg = InboundMessage::new("p1", Command::PlayHand).with_decision(vec![0, 1]);
        let err = game.receive_response(&[msg]).unwrap_err();
        assert_eq!(err, GameError::InvalidMove);
        assert_eq!(game.pile(), &pile_before[..]);
        assert_eq!(game.rejection_messages(&err, &PlayerId::from("p1")).len(), 2);
    }

    #[test]
    fn test_play_hand_illegal_card_is_invalid_move() {
        let mut game = staged(
            Stage::ClearCards,
            vec![c(Rank::King, Suit::Spades)],
            PlayerCards::new(
                vec![c(Rank::Four, Suit::Clubs), c(Rank::Ace, Suit::Clubs)],
                vec![],
                vec![],
            )
            .unwrap(),
            0,
        );
        let prompt = game.next().unwrap();
        assert_eq!(for_player(&prompt, "p1").moves, Some(vec![1]));

        let msg = InboundMessage::new("p1", Command::PlayHand).with_decision(vec![0]);
        assert_eq!(game.receive_response(&[msg]).unwrap_err(), GameError::InvalidMove);
    }

    // -- S1: burn with a ten --

    #[test]
    fn test_burn_with_ten_keeps_turn() {
        let pile = vec![
            c(Rank::Six, Suit::Diamonds),
            c(Rank::Six, Suit::Spades),
            c(Rank::Eight, Suit::Hearts),
            c(Rank::Nine, Suit::Hearts),
            c(Rank::Two, Suit::Spades),
            c(Rank::Seven, Suit::Clubs),
            c(Rank::Four, Suit::Spades),
        ];
        let hand = vec![
            c(Rank::Ten, Suit::Hearts),
            c(Rank::Ace, Suit::Hearts),
            c(Rank::Queen, Suit::Clubs),
        ];
        let mut game = staged(
            Stage::ClearCards,
            pile,
            PlayerCards::new(hand, vec![], vec![]).unwrap(),
            0,
        );

        let prompt = game.next().unwrap();
        assert_eq!(for_player(&prompt, "p1").command, Command::PlayHand);
        assert_eq!(for_player(&prompt, "p2").command, Command::Turn);

        let burn = respond(&mut game, "p1", Command::PlayHand, vec![0]);
        assert!(burn.iter().all(|m| m.command == Command::Burn));
        assert!(for_player(&burn, "p1").should_respond);
        assert_eq!(game.pile().len(), 8, "pile clears only on the ack");

        assert!(respond(&mut game, "p1", Command::Burn, vec![]).is_empty());
        assert!(game.pile().is_empty());
        assert_eq!(game.current_turn_index(), 0);
        assert_eq!(game.awaited_command(), Command::Null);

        let again = game.next().unwrap();
        assert_eq!(for_player(&again, "p1").command, Command::PlayHand);
    }

    #[test]
    fn test_ten_on_short_pile_stays_on_pile() {
        let hand = vec![
            c(Rank::Ten, Suit::Hearts),
            c(Rank::Ace, Suit::Hearts),
            c(Rank::Queen, Suit::Clubs),
        ];
        let mut game = staged(
            Stage::ClearCards,
            vec![c(Rank::Five, Suit::Clubs)],
            PlayerCards::new(hand, vec![], vec![]).unwrap(),
            0,
        );
        game.next().unwrap();

        let out = respond(&mut game, "p1", Command::PlayHand, vec![0]);
        assert!(out.iter().all(|m| m.command != Command::Burn));
        assert_eq!(game.awaited_command(), Command::EndOfTurn);
        assert_eq!(
            game.pile(),
            &[c(Rank::Five, Suit::Clubs), c(Rank::Ten, Suit::Hearts)]
        );

        respond(&mut game, "p1", Command::EndOfTurn, vec![]);
        assert_eq!(game.current_turn_index(), 1);
    }

    // -- S2: four of a kind in ClearDeck --

    #[test]
    fn test_four_sixes_burn_in_clear_deck() {
        let pile = vec![
            c(Rank::Four, Suit::Hearts),
            c(Rank::Two, Suit::Spades),
            c(Rank::Six, Suit::Hearts),
            c(Rank::Six, Suit::Spades),
            c(Rank::Six, Suit::Clubs),
        ];
        let hand = vec![
            c(Rank::Eight, Suit::Hearts),
            c(Rank::Six, Suit::Diamonds),
            c(Rank::Five, Suit::Diamonds),
        ];
        let mut game = staged(
            Stage::ClearDeck,
            pile,
            PlayerCards::new(hand, vec![], vec![]).unwrap(),
            4,
        );
        game.next().unwrap();

        let burn = respond(&mut game, "p1", Command::PlayHand, vec![1]);
        assert!(burn.iter().all(|m| m.command == Command::Burn));
        let cards = game.player_cards(&PlayerId::from("p1")).unwrap();
        assert_eq!(cards.hand().len(), 3, "hand replenished from the deck");
        assert_eq!(game.deck().len(), 3);

        respond(&mut game, "p1", Command::Burn, vec![]);
        assert!(game.pile().is_empty());
        assert_eq!(game.current_turn_index(), 0);
    }

    #[test]
    fn test_burn_ack_with_empty_deck_moves_to_clear_cards() {
        let pile = vec![
            c(Rank::Four, Suit::Hearts),
            c(Rank::Six, Suit::Hearts),
            c(Rank::Six, Suit::Spades),
            c(Rank::Six, Suit::Clubs),
        ];
        let hand = vec![
            c(Rank::Eight, Suit::Hearts),
            c(Rank::Six, Suit::Diamonds),
            c(Rank::Five, Suit::Diamonds),
        ];
        let mut game = staged(
            Stage::ClearDeck,
            pile,
            PlayerCards::new(hand, vec![], vec![]).unwrap(),
            0,
        );
        game.next().unwrap();

        respond(&mut game, "p1", Command::PlayHand, vec![1]);
        assert_eq!(game.awaited_command(), Command::Burn);
        assert_eq!(game.stage(), Stage::ClearDeck);

        respond(&mut game, "p1", Command::Burn, vec![]);
        assert_eq!(game.stage(), Stage::ClearCards);
        assert_eq!(game.current_turn_index(), 0);
    }

    #[test]
    fn test_pick_up_empty_pile_changes_nothing() {
        let hand = vec![c(Rank::Nine, Suit::Hearts), c(Rank::Five, Suit::Diamonds)];
        let mut game = staged(
            Stage::ClearCards,
            vec![],
            PlayerCards::new(hand.clone(), vec![], vec![]).unwrap(),
            0,
        );

        game.pick_up_pile(0);
        assert!(game.pile().is_empty());
        assert_eq!(game.player_cards(&PlayerId::from("p1")).unwrap().hand(), &hand[..]);
    }

    // -- ClearDeck turn --

    #[test]
    fn test_clear_deck_play_replenishes_then_advances() {
        let hand = vec![
            c(Rank::Nine, Suit::Hearts),
            c(Rank::Nine, Suit::Clubs),
            c(Rank::Five, Suit::Diamonds),
        ];
        let mut game = staged(
            Stage::ClearDeck,
            vec![c(Rank::Eight, Suit::Spades)],
            PlayerCards::new(hand, vec![], vec![]).unwrap(),
            1,
        );
        game.next().unwrap();

        let end = respond(&mut game, "p1", Command::PlayHand, vec![0, 1]);
        assert_eq!(for_player(&end, "p1").command, Command::ReplenishHand);
        assert_eq!(for_player(&end, "p2").command, Command::EndOfTurn);
        assert_eq!(game.player_cards(&PlayerId::from("p1")).unwrap().hand().len(), 2);
        assert!(game.deck().is_empty());

        respond(&mut game, "p1", Command::ReplenishHand, vec![]);
        assert_eq!(game.stage(), Stage::ClearCards);
        assert_eq!(game.current_turn_index(), 1);
    }

    #[test]
    fn test_no_legal_move_picks_up_pile() {
        let mut game = staged(
            Stage::ClearDeck,
            vec![c(Rank::Ace, Suit::Spades)],
            PlayerCards::new(vec![c(Rank::Four, Suit::Clubs)], vec![], vec![]).unwrap(),
            5,
        );
        let skip = game.next().unwrap();
        assert!(skip.iter().all(|m| m.command == Command::SkipTurn));
        assert!(game.pile().is_empty());
        assert_eq!(game.player_cards(&PlayerId::from("p1")).unwrap().hand().len(), 2);

        respond(&mut game, "p1", Command::SkipTurn, vec![]);
        assert_eq!(game.current_turn_index(), 1);
    }

    // -- ClearCards --

    #[test]
    fn test_clear_cards_plays_seen_after_hand() {
        let seen = vec![
            c(Rank::Nine, Suit::Hearts),
            c(Rank::Four, Suit::Clubs),
            c(Rank::Jack, Suit::Diamonds),
        ];
        let unseen = vec![
            c(Rank::Two, Suit::Hearts),
            c(Rank::Two, Suit::Clubs),
            c(Rank::Two, Suit::Diamonds),
        ];
        let mut game = staged(
            Stage::ClearCards,
            vec![c(Rank::Eight, Suit::Spades)],
            PlayerCards::new(vec![], seen, unseen).unwrap(),
            0,
        );
        let prompt = game.next().unwrap();
        let mine = for_player(&prompt, "p1");
        assert_eq!(mine.command, Command::PlaySeen);
        assert_eq!(mine.moves, Some(vec![0, 2]));

        let end = respond(&mut game, "p1", Command::PlaySeen, vec![2]);
        assert!(end.iter().all(|m| m.command == Command::EndOfTurn));
        respond(&mut game, "p1", Command::EndOfTurn, vec![]);
        assert_eq!(game.current_turn_index(), 1);
    }

    // -- S5: blind play fails --

    #[test]
    fn test_unseen_failure_picks_up_pile() {
        let unseen = vec![
            c(Rank::Eight, Suit::Hearts),
            c(Rank::Nine, Suit::Clubs),
            c(Rank::Six, Suit::Diamonds),
        ];
        let mut game = staged(
            Stage::ClearCards,
            vec![c(Rank::Ace, Suit::Spades)],
            PlayerCards::new(vec![], vec![], unseen).unwrap(),
            0,
        );

        let prompt = game.next().unwrap();
        let mine = for_player(&prompt, "p1");
        assert_eq!(mine.command, Command::PlayUnseen);
        assert_eq!(mine.moves, Some(vec![0, 1, 2]));

        let failure = respond(&mut game, "p1", Command::PlayUnseen, vec![0]);
        assert!(failure.iter().all(|m| m.command == Command::UnseenFailure));
        assert_eq!(game.awaited_command(), Command::UnseenFailure);
        assert!(game.player_cards(&PlayerId::from("p1")).unwrap().is_unseen_visible(0));

        respond(&mut game, "p1", Command::UnseenFailure, vec![]);
        let cards = game.player_cards(&PlayerId::from("p1")).unwrap();
        assert_eq!(
            cards.hand(),
            &[c(Rank::Ace, Suit::Spades), c(Rank::Eight, Suit::Hearts)]
        );
        assert_eq!(cards.unseen().len(), 2);
        assert!(game.pile().is_empty());
        assert_eq!(game.current_turn_index(), 1);
    }

    #[test]
    fn test_play_unseen_needs_exactly_one_card() {
        let unseen = vec![
            c(Rank::Eight, Suit::Hearts),
            c(Rank::Nine, Suit::Clubs),
            c(Rank::Six, Suit::Diamonds),
        ];
        let mut game = staged(
            Stage::ClearCards,
            vec![],
            PlayerCards::new(vec![], vec![], unseen).unwrap(),
            0,
        );
        game.next().unwrap();

        let msg = InboundMessage::new("p1", Command::PlayUnseen).with_decision(vec![0, 1]);
        assert_eq!(game.receive_response(&[msg]).unwrap_err(), GameError::PlayOneCard);
        assert!(!game.player_cards(&PlayerId::from("p1")).unwrap().is_unseen_visible(0));
    }

    // -- finishing --

    #[test]
    fn test_last_unseen_success_finishes_and_ends_game() {
        let mut game = staged(
            Stage::ClearCards,
            vec![c(Rank::Five, Suit::Spades)],
            PlayerCards::new(vec![], vec![], vec![c(Rank::King, Suit::Hearts)]).unwrap(),
            0,
        );
        game.next().unwrap();

        let success = respond(&mut game, "p1", Command::PlayUnseen, vec![0]);
        assert!(success.iter().all(|m| m.command == Command::UnseenSuccess));

        let finished = respond(&mut game, "p1", Command::UnseenSuccess, vec![]);
        assert!(finished.iter().all(|m| m.command == Command::PlayerFinished));

        let over = respond(&mut game, "p1", Command::PlayerFinished, vec![]);
        assert!(over.iter().all(|m| m.command == Command::GameOver));
        assert_eq!(game.play_state(), PlayState::Over);
        assert!(game.active_players().is_empty());
        let order: Vec<_> = game.finished_players().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec!["p1", "p2"]);

        // Over is terminal.
        assert!(game.next().unwrap().iter().all(|m| m.command == Command::GameOver));
    }

    #[test]
    fn test_finish_in_three_player_game_keeps_turn_slot() {
        let mut game = Shed::with_seed(5);
        game.start(three_players()).unwrap();
        game.stage = Stage::ClearCards;
        game.current_turn = 2;
        game.deck = Deck::from_cards(Vec::new());
        let last = game.cards[2].hand()[0];
        game.cards[2] = PlayerCards::new(vec![last], vec![], vec![]).unwrap();
        game.pile.clear();

        game.next().unwrap();
        let finished = respond(&mut game, "p3", Command::PlayHand, vec![0]);
        if finished[0].command == Command::Burn {
            respond(&mut game, "p3", Command::Burn, vec![]);
        }
        assert_eq!(game.awaited_command(), Command::PlayerFinished);

        respond(&mut game, "p3", Command::PlayerFinished, vec![]);
        assert_eq!(game.play_state(), PlayState::InProgress);
        assert_eq!(game.active_players().len(), 2);
        assert_eq!(game.current_turn_index(), 0, "wraps to the first active player");
        assert_eq!(game.current_player().unwrap().id.as_str(), "p1");
    }

    // -- views --

    #[test]
    fn test_messages_carry_full_view() {
        let mut game = Shed::with_seed(2);
        game.start(two_players()).unwrap();
        let batch = game.next().unwrap();
        let msg = for_player(&batch, "p1");

        assert_eq!(msg.name, "Alice");
        assert_eq!(msg.hand.len(), 3);
        assert_eq!(msg.seen.len(), 3);
        assert_eq!(msg.unseen, vec![shed_protocol::UnseenCard::Hidden; 3]);
        assert_eq!(msg.deck_count, 52 - 18);
        let opponents = msg.opponents.as_ref().unwrap();
        assert_eq!(opponents.len(), 1);
        assert_eq!(opponents[0].id.as_str(), "p2");
        assert_eq!(opponents[0].seen.len(), 3);
        assert!(msg.current_turn.is_some());
        assert!(msg.finished_players.is_none());
    }
}
