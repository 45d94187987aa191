//! The draw pile.

use rand::Rng;
use rand::seq::SliceRandom;
use shed_protocol::{Card, Rank, Suit};

/// Number of cards in a full deck.
pub const DECK_SIZE: usize = 52;

/// An ordered draw pile. The top of the deck is the end of the vector.
///
/// Once drained the deck is never refilled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A full, unshuffled 52-card deck (suit-major, Ace to King).
    pub fn new() -> Self {
        let cards = Suit::ALL
            .iter()
            .flat_map(|&suit| Rank::ALL.iter().map(move |&rank| Card::new(rank, suit)))
            .collect();
        Self { cards }
    }

    /// A full deck shuffled with `rng`.
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::new();
        deck.shuffle(rng);
        deck
    }

    /// A deck holding exactly `cards`, last element on top.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Fisher–Yates shuffle in place.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Removes and returns up to `n` cards from the top, top card first.
    ///
    /// Returns fewer than `n` (possibly none) if the deck runs out.
    pub fn deal(&mut self, n: usize) -> Vec<Card> {
        let at = self.cards.len().saturating_sub(n);
        let mut dealt = self.cards.split_off(at);
        dealt.reverse();
        dealt
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The remaining cards, bottom first.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_new_has_52_unique_cards() {
        let deck = Deck::new();
        assert_eq!(deck.len(), DECK_SIZE);
        let unique: HashSet<_> = deck.cards().iter().collect();
        assert_eq!(unique.len(), DECK_SIZE);
    }

    #[test]
    fn test_shuffled_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let deck = Deck::shuffled(&mut rng);
        let shuffled: HashSet<_> = deck.cards().iter().copied().collect();
        let fresh: HashSet<_> = Deck::new().cards().iter().copied().collect();
        assert_eq!(shuffled, fresh);
        assert_ne!(deck, Deck::new(), "seed 7 should move at least one card");
    }

    #[test]
    fn test_shuffled_same_seed_same_order() {
        let a = Deck::shuffled(&mut StdRng::seed_from_u64(42));
        let b = Deck::shuffled(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_deal_takes_from_top() {
        let two = Card::new(Rank::Two, Suit::Clubs);
        let king = Card::new(Rank::King, Suit::Hearts);
        let ace = Card::new(Rank::Ace, Suit::Spades);
        let mut deck = Deck::from_cards(vec![two, king, ace]);

        assert_eq!(deck.deal(2), vec![ace, king]);
        assert_eq!(deck.cards(), &[two]);
    }

    #[test]
    fn test_deal_more_than_remaining_returns_rest() {
        let mut deck = Deck::new();
        deck.deal(50);
        assert_eq!(deck.deal(5).len(), 2);
        assert!(deck.is_empty());
    }

    #[test]
    fn test_deal_from_empty_returns_empty() {
        let mut deck = Deck::from_cards(Vec::new());
        assert!(deck.deal(3).is_empty());
    }

    #[test]
    fn test_deal_zero_returns_empty() {
        let mut deck = Deck::new();
        assert!(deck.deal(0).is_empty());
        assert_eq!(deck.len(), DECK_SIZE);
    }
}
