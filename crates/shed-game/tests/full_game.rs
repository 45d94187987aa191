//! Plays whole seeded games with simple bots and checks the table
//! invariants after every step.

use std::collections::HashSet;

use shed_game::{DECK_SIZE, GameError, PlayState, Shed, Stage, rules};
use shed_protocol::{Card, Command, InboundMessage, OutboundMessage, PlayerInfo};

const MAX_STEPS: usize = 5_000;

fn players(n: usize) -> Vec<PlayerInfo> {
    (1..=n)
        .map(|i| PlayerInfo::new(format!("p{i}"), format!("Player {i}")))
        .collect()
}

/// Where every card is, in one flat list.
fn every_card(game: &Shed) -> Vec<Card> {
    let mut all: Vec<Card> = game.deck().cards().to_vec();
    all.extend_from_slice(game.pile());
    for p in game.players() {
        all.extend(game.player_cards(&p.id).unwrap().cards());
    }
    all
}

fn check_invariants(game: &mut Shed) {
    // Conservation and uniqueness.
    let all = every_card(game);
    assert_eq!(all.len(), DECK_SIZE, "cards lost or duplicated");
    let unique: HashSet<_> = all.iter().collect();
    assert_eq!(unique.len(), DECK_SIZE, "a card sits in two places");

    // Group bounds.
    for p in game.players() {
        game.player_cards(&p.id).unwrap().validate().unwrap();
    }

    // Finish bookkeeping.
    let active = game.active_players().len();
    let finished = game.finished_players().len();
    assert_eq!(active + finished, game.players().len());

    match game.play_state() {
        PlayState::InProgress => {
            assert!(active > 1);
            assert!(game.current_turn_index() < active);

            // Awaited-command discipline; both calls fail without effect.
            if game.awaited_command() == Command::Null {
                assert_eq!(
                    game.receive_response(&[]).unwrap_err(),
                    GameError::UnexpectedResponse
                );
            } else {
                let awaited = game.awaited_command();
                assert_eq!(game.next().unwrap_err(), GameError::AwaitingResponse(awaited));
            }
        }
        PlayState::Over => assert!(active <= 1),
        PlayState::Idle => unreachable!("game was started"),
    }
}

/// Lowest playable rank first, specials last; plays every copy of it.
fn choose(cards: &[Card], moves: &[usize]) -> Vec<usize> {
    let strength = |i: usize| rules::ordering_value(cards[i].rank).unwrap_or(u8::MAX);
    let Some(&best) = moves.iter().min_by_key(|&&i| strength(i)) else {
        return Vec::new();
    };
    moves
        .iter()
        .copied()
        .filter(|&i| cards[i].rank == cards[best].rank)
        .collect()
}

fn answer(prompt: &OutboundMessage) -> InboundMessage {
    let moves = prompt.moves.clone().unwrap_or_default();
    let decision = match prompt.command {
        Command::PlayHand => choose(&prompt.hand, &moves),
        Command::PlaySeen => choose(&prompt.seen, &moves),
        Command::PlayUnseen => vec![moves[0]],
        _ => Vec::new(),
    };
    InboundMessage::new(prompt.player_id.clone(), prompt.command).with_decision(decision)
}

/// Runs one game until it is over or the step limit runs out. Returns
/// whether it ended.
fn play(seed: u64, n: usize) -> bool {
    let mut game = Shed::with_seed(seed);
    game.start(players(n)).unwrap();
    let mut batch: Vec<OutboundMessage> = Vec::new();
    let mut saw_clear_cards = false;

    for _ in 0..MAX_STEPS {
        check_invariants(&mut game);
        saw_clear_cards |= game.stage() == Stage::ClearCards;

        match game.awaited_command() {
            _ if game.play_state() == PlayState::Over => {
                assert!(saw_clear_cards);
                assert!(batch.iter().all(|m| m.command == Command::GameOver));
                assert_eq!(batch.len(), n);
                return true;
            }
            Command::Null => batch = game.next().unwrap(),
            Command::Reorg => {
                let replies: Vec<_> = batch
                    .iter()
                    .map(|m| {
                        InboundMessage::new(m.player_id.clone(), Command::Reorg)
                            .with_decision(vec![0, 1, 2])
                    })
                    .collect();
                batch = game.receive_response(&replies).unwrap();
            }
            awaited => {
                let prompts: Vec<_> = batch.iter().filter(|m| m.should_respond).collect();
                assert_eq!(prompts.len(), 1, "exactly one player must answer {awaited}");
                assert_eq!(prompts[0].command, awaited);
                let reply = answer(prompts[0]);
                batch = game.receive_response(&[reply]).unwrap();
            }
        }
    }
    false
}

#[test]
fn test_full_games_hold_invariants() {
    for seed in 0..8 {
        for n in 2..=4 {
            assert!(
                play(seed, n),
                "seed {seed} with {n} players did not finish in {MAX_STEPS} steps"
            );
        }
    }
}

#[test]
fn test_same_seed_replays_identically() {
    let run = |seed| {
        let mut game = Shed::with_seed(seed);
        game.start(players(3)).unwrap();
        (game.current_turn_index(), every_card(&game))
    };
    assert_eq!(run(11), run(11));
}
