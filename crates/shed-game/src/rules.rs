//! Pure rule evaluation: what may be played on the pile, and when the pile
//! burns.
//!
//! Special ranks:
//!
//! - **Two** resets the pile: anything may be played on it.
//! - **Three** is transparent: comparisons look through it to the first
//!   non-three card below.
//! - **Seven** caps the pile: only 4, 5, 6, 7, 2 and 3 may follow it.
//! - **Ten** burns the pile.
//!
//! Two, Three and Ten may be played on anything.

use shed_protocol::{Card, Rank};

/// Ranks that may be played on an effective Seven.
pub const SEVEN_BEATERS: [Rank; 6] = [
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Two,
    Rank::Three,
];

/// Number of equal ranks on top of the pile that burn it.
const BURN_RUN: usize = 4;

/// Comparison value for ranks without a special power (and Seven, which
/// sits between Six and Eight when played onto an ordinary card).
///
/// Returns `None` for Two, Three and Ten.
pub fn ordering_value(rank: Rank) -> Option<u8> {
    match rank {
        Rank::Four => Some(1),
        Rank::Five => Some(2),
        Rank::Six => Some(3),
        Rank::Seven => Some(4),
        Rank::Eight => Some(5),
        Rank::Nine => Some(6),
        Rank::Jack => Some(7),
        Rank::Queen => Some(8),
        Rank::King => Some(9),
        Rank::Ace => Some(10),
        Rank::Two | Rank::Three | Rank::Ten => None,
    }
}

/// Ranks that are legal on any pile.
pub fn is_wild(rank: Rank) -> bool {
    matches!(rank, Rank::Two | Rank::Three | Rank::Ten)
}

pub fn is_seven_beater(rank: Rank) -> bool {
    SEVEN_BEATERS.contains(&rank)
}

/// The card that governs what may be played next: the most recent
/// non-three card, if any.
pub fn effective_top(pile: &[Card]) -> Option<Card> {
    pile.iter().rev().find(|c| c.rank != Rank::Three).copied()
}

/// Returns `true` if `card` may be played on `pile`.
pub fn can_play(pile: &[Card], card: Card) -> bool {
    if is_wild(card.rank) {
        return true;
    }
    let Some(top) = effective_top(pile) else {
        return true;
    };
    match top.rank {
        Rank::Two => true,
        Rank::Seven => is_seven_beater(card.rank),
        _ => match (ordering_value(card.rank), ordering_value(top.rank)) {
            (Some(candidate), Some(top)) => candidate >= top,
            // A Ten that did not burn leaves the pile open to anything.
            _ => true,
        },
    }
}

/// Indices into `candidates` that may legally be played on `pile`, in
/// ascending order.
pub fn legal_moves(pile: &[Card], candidates: &[Card]) -> Vec<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|&(_, &card)| can_play(pile, card))
        .map(|(i, _)| i)
        .collect()
}

/// Returns `true` if the pile, as it stands after the latest play, burns.
///
/// A pile shorter than four cards never burns. Otherwise it burns when the
/// last card is a Ten, when the last four non-three cards share a rank, or
/// when the last four cards are all Threes.
pub fn is_burn(pile: &[Card]) -> bool {
    let Some(last) = pile.last() else {
        return false;
    };
    if pile.len() < BURN_RUN {
        return false;
    }
    if last.rank == Rank::Ten {
        return true;
    }

    let mut run = pile
        .iter()
        .rev()
        .filter(|c| c.rank != Rank::Three)
        .take(BURN_RUN);
    if let Some(first) = run.next() {
        let rest: Vec<_> = run.collect();
        if rest.len() == BURN_RUN - 1 && rest.iter().all(|c| c.rank == first.rank) {
            return true;
        }
    }

    pile.iter().rev().take(BURN_RUN).all(|c| c.rank == Rank::Three)
}

/// Returns `true` if every card in `cards` has the same rank. An empty
/// selection is not a play.
pub fn same_rank(cards: &[Card]) -> bool {
    match cards.split_first() {
        Some((first, rest)) => rest.iter().all(|c| c.rank == first.rank),
        None => false,
    }
}
