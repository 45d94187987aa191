//! Playing cards and their wire encoding.
//!
//! On the wire a card is `{ "rank": 0..=12, "suit": 0..=3 }`, where rank 0
//! is the Ace and 12 the King, and suits are ordered Clubs, Diamonds,
//! Hearts, Spades. A face-down card whose face the recipient may not see
//! is sent as the sentinel `{ "rank": -1, "suit": -1 }`, which clients
//! render as `?`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// The thirteen ranks, in wire order (Ace = 0 … King = 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Ace = 0,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    /// Every rank in wire order.
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Looks up a rank by its wire ordinal.
    pub fn from_ordinal(n: i8) -> Option<Self> {
        usize::try_from(n).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// The wire ordinal (0..=12).
    pub fn ordinal(self) -> i8 {
        self as i8
    }

    /// Single-character symbol used in card names (`T` for ten).
    pub fn symbol(self) -> char {
        match self {
            Rank::Ace => 'A',
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
        }
    }

    /// English name, e.g. `"Queen"`.
    pub fn name(self) -> &'static str {
        match self {
            Rank::Ace => "Ace",
            Rank::Two => "Two",
            Rank::Three => "Three",
            Rank::Four => "Four",
            Rank::Five => "Five",
            Rank::Six => "Six",
            Rank::Seven => "Seven",
            Rank::Eight => "Eight",
            Rank::Nine => "Nine",
            Rank::Ten => "Ten",
            Rank::Jack => "Jack",
            Rank::Queen => "Queen",
            Rank::King => "King",
        }
    }
}

/// The four suits, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Clubs = 0,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    /// Every suit in wire order.
    pub const ALL: [Suit; 4] =
        [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    /// Looks up a suit by its wire ordinal.
    pub fn from_ordinal(n: i8) -> Option<Self> {
        usize::try_from(n).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// The wire ordinal (0..=3).
    pub fn ordinal(self) -> i8 {
        self as i8
    }

    pub fn symbol(self) -> char {
        match self {
            Suit::Clubs => '♣',
            Suit::Diamonds => '♦',
            Suit::Hearts => '♥',
            Suit::Spades => '♠',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Suit::Clubs => "Clubs",
            Suit::Diamonds => "Diamonds",
            Suit::Hearts => "Hearts",
            Suit::Spades => "Spades",
        }
    }
}

/// A playing card. Equality is structural.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(into = "RawCard", try_from = "RawCard")]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// Long-form name, e.g. `"Ten of Hearts"`.
    pub fn name(&self) -> String {
        format!("{} of {}", self.rank.name(), self.suit.name())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.symbol(), self.suit.symbol())
    }
}

/// A face-down card as seen by one particular recipient.
///
/// The owner learns a face-down card only once it has been turned over
/// during a blind play; until then it travels as the hidden sentinel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(into = "RawCard", try_from = "RawCard")]
pub enum UnseenCard {
    Hidden,
    Shown(Card),
}

impl fmt::Display for UnseenCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnseenCard::Hidden => write!(f, "?"),
            UnseenCard::Shown(card) => card.fmt(f),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire representation
// ---------------------------------------------------------------------------

const HIDDEN: i8 = -1;

/// The literal JSON shape shared by [`Card`] and [`UnseenCard`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawCard {
    rank: i8,
    suit: i8,
}

impl From<Card> for RawCard {
    fn from(card: Card) -> Self {
        RawCard {
            rank: card.rank.ordinal(),
            suit: card.suit.ordinal(),
        }
    }
}

impl TryFrom<RawCard> for Card {
    type Error = ProtocolError;

    fn try_from(raw: RawCard) -> Result<Self, Self::Error> {
        let rank = Rank::from_ordinal(raw.rank).ok_or_else(|| {
            ProtocolError::InvalidMessage(format!("rank {} out of range", raw.rank))
        })?;
        let suit = Suit::from_ordinal(raw.suit).ok_or_else(|| {
            ProtocolError::InvalidMessage(format!("suit {} out of range", raw.suit))
        })?;
        Ok(Card::new(rank, suit))
    }
}

impl From<UnseenCard> for RawCard {
    fn from(card: UnseenCard) -> Self {
        match card {
            UnseenCard::Hidden => RawCard {
                rank: HIDDEN,
                suit: HIDDEN,
            },
            UnseenCard::Shown(card) => card.into(),
        }
    }
}

impl TryFrom<RawCard> for UnseenCard {
    type Error = ProtocolError;

    fn try_from(raw: RawCard) -> Result<Self, Self::Error> {
        if raw.rank == HIDDEN && raw.suit == HIDDEN {
            return Ok(UnseenCard::Hidden);
        }
        Card::try_from(raw).map(UnseenCard::Shown)
    }
}
