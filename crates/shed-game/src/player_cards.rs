//! One player's three card groups.

use std::collections::HashSet;

use shed_protocol::{Card, CardsSnapshot, UnseenCard};

use crate::error::GameError;
use crate::rules;

/// Size of the face-up and face-down groups at the deal, and the hand size
/// kept topped up while the deck lasts.
pub const GROUP_SIZE: usize = 3;

/// The two groups a player plays from by choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardGroup {
    Hand,
    Seen,
}

/// A player's hand, face-up (seen) and face-down (unseen) cards.
///
/// Face-down cards keep an index-aligned visibility flag that flips when
/// the card is turned over during a blind play.
///
/// # Invariants
///
/// - at most [`GROUP_SIZE`] face-up and face-down cards
/// - face-up cards only exist while the face-down group is full
/// - no card appears twice across the three groups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerCards {
    hand: Vec<Card>,
    seen: Vec<Card>,
    unseen: Vec<Card>,
    unseen_visible: Vec<bool>,
}

impl PlayerCards {
    /// Creates a validated set of groups with every face-down card hidden.
    pub fn new(hand: Vec<Card>, seen: Vec<Card>, unseen: Vec<Card>) -> Result<Self, GameError> {
        let cards = Self {
            hand,
            seen,
            unseen_visible: vec![false; unseen.len()],
            unseen,
        };
        cards.validate()?;
        Ok(cards)
    }

    /// Checks the structural invariants.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.seen.len() > GROUP_SIZE {
            return Err(GameError::InvalidCards(format!(
                "{} face-up cards",
                self.seen.len()
            )));
        }
        if self.unseen.len() > GROUP_SIZE {
            return Err(GameError::InvalidCards(format!(
                "{} face-down cards",
                self.unseen.len()
            )));
        }
        if self.unseen.len() < GROUP_SIZE && !self.seen.is_empty() {
            return Err(GameError::InvalidCards(format!(
                "{} face-up cards left with only {} face-down",
                self.seen.len(),
                self.unseen.len()
            )));
        }
        if self.unseen_visible.len() != self.unseen.len() {
            return Err(GameError::InvalidCards(
                "visibility flags out of step with face-down cards".into(),
            ));
        }
        let mut held = HashSet::new();
        for card in self.cards() {
            if !held.insert(card) {
                return Err(GameError::InvalidCards(format!("{card} held twice")));
            }
        }
        Ok(())
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn seen(&self) -> &[Card] {
        &self.seen
    }

    pub fn unseen(&self) -> &[Card] {
        &self.unseen
    }

    /// Whether face-down card `index` has been turned over.
    pub fn is_unseen_visible(&self, index: usize) -> bool {
        self.unseen_visible.get(index).copied().unwrap_or(false)
    }

    pub fn group(&self, group: CardGroup) -> &[Card] {
        match group {
            CardGroup::Hand => &self.hand,
            CardGroup::Seen => &self.seen,
        }
    }

    /// Every card the player holds, hand first.
    pub fn cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.hand
            .iter()
            .chain(&self.seen)
            .chain(&self.unseen)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.hand.len() + self.seen.len() + self.unseen.len()
    }

    /// `true` once all three groups are empty: the player has finished.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swaps cards between hand and face-up before play.
    ///
    /// `decision` names [`GROUP_SIZE`] distinct indices into `hand ‖ seen`;
    /// those cards become the new hand and the rest the new face-up group,
    /// both in their original order.
    pub fn reorganise(&mut self, decision: &[usize]) -> Result<(), GameError> {
        let combined: Vec<Card> = self.hand.iter().chain(&self.seen).copied().collect();
        if decision.len() != GROUP_SIZE || combined.len() != 2 * GROUP_SIZE {
            return Err(GameError::InvalidMove);
        }
        let mut chosen = vec![false; combined.len()];
        for &i in decision {
            match chosen.get_mut(i) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(GameError::InvalidMove),
            }
        }

        let (hand, seen): (Vec<_>, Vec<_>) = combined
            .into_iter()
            .zip(chosen)
            .partition(|&(_, picked)| picked);
        self.hand = hand.into_iter().map(|(card, _)| card).collect();
        self.seen = seen.into_iter().map(|(card, _)| card).collect();
        Ok(())
    }

    /// The cards at `indices` in `group`, without removing them.
    ///
    /// A selection must be non-empty, name distinct in-range indices, and
    /// hold cards of a single rank.
    pub fn select(&self, group: CardGroup, indices: &[usize]) -> Result<Vec<Card>, GameError> {
        let cards = self.group(group);
        let mut picked = HashSet::new();
        let mut selection = Vec::with_capacity(indices.len());
        for &i in indices {
            let card = cards.get(i).ok_or(GameError::InvalidMove)?;
            if !picked.insert(i) {
                return Err(GameError::InvalidMove);
            }
            selection.push(*card);
        }
        if !rules::same_rank(&selection) {
            return Err(GameError::InvalidMove);
        }
        Ok(selection)
    }

    /// Removes and returns the cards at `indices` in `group`, in the order
    /// the indices were given. Nothing changes if the selection is invalid.
    pub fn take(&mut self, group: CardGroup, indices: &[usize]) -> Result<Vec<Card>, GameError> {
        let selection = self.select(group, indices)?;
        let cards = match group {
            CardGroup::Hand => &mut self.hand,
            CardGroup::Seen => &mut self.seen,
        };
        let mut doomed = indices.to_vec();
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for i in doomed {
            cards.remove(i);
        }
        Ok(selection)
    }

    /// Turns face-down card `index` over and returns it.
    pub fn reveal_unseen(&mut self, index: usize) -> Result<Card, GameError> {
        let card = *self.unseen.get(index).ok_or(GameError::InvalidMove)?;
        self.unseen_visible[index] = true;
        Ok(card)
    }

    /// Removes face-down card `index`.
    pub fn take_unseen(&mut self, index: usize) -> Result<Card, GameError> {
        if index >= self.unseen.len() {
            return Err(GameError::InvalidMove);
        }
        self.unseen_visible.remove(index);
        Ok(self.unseen.remove(index))
    }

    /// Adds drawn or picked-up cards to the hand.
    pub fn add_to_hand(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.hand.extend(cards);
    }

    /// What the owner is shown: face-down cards stay hidden until turned.
    pub fn snapshot(&self) -> CardsSnapshot {
        let unseen = self
            .unseen
            .iter()
            .zip(&self.unseen_visible)
            .map(|(&card, &visible)| {
                if visible {
                    UnseenCard::Shown(card)
                } else {
                    UnseenCard::Hidden
                }
            })
            .collect();
        CardsSnapshot {
            hand: self.hand.clone(),
            seen: self.seen.clone(),
            unseen,
        }
    }
}
