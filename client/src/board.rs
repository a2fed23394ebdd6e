//! Bet list reconciliation.
//!
//! The board and the "my bets" panel are derived independently from the same
//! bet list: the board collapses bets by number, the panel never does.

use paradrop_types::{Bet, Number};

/// One physical position on the board.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoardSlot {
    pub number: Option<Number>,
    /// Username of the first bettor on `number`.
    pub username: String,
    pub winning: bool,
}

impl BoardSlot {
    pub fn is_empty(&self) -> bool {
        self.number.is_none()
    }
}

/// Assign each distinct number to the next free slot, in order of first
/// occurrence. Numbers beyond `capacity` are dropped from the board.
pub fn assign_slots(bets: &[Bet], capacity: usize) -> Vec<BoardSlot> {
    let mut slots: Vec<BoardSlot> = Vec::with_capacity(capacity);
    for bet in bets {
        if slots.len() == capacity {
            break;
        }
        if slots.iter().any(|slot| slot.number == Some(bet.number)) {
            continue;
        }
        slots.push(BoardSlot {
            number: Some(bet.number),
            username: bet.username.clone(),
            winning: false,
        });
    }
    slots.resize_with(capacity, BoardSlot::default);
    slots
}

/// Count of distinct numbers that did not fit on the board.
pub fn overflow(bets: &[Bet], capacity: usize) -> usize {
    let mut distinct: Vec<Number> = Vec::new();
    for bet in bets {
        if !distinct.contains(&bet.number) {
            distinct.push(bet.number);
        }
    }
    distinct.len().saturating_sub(capacity)
}

/// Numbers of the bets owned by `user_id`, in list order and with repeats.
pub fn my_bets(bets: &[Bet], user_id: &str) -> Vec<Number> {
    bets.iter()
        .filter(|bet| bet.user_id == user_id)
        .map(|bet| bet.number)
        .collect()
}

/// Index of the slot displaying `number`.
pub fn slot_of(slots: &[BoardSlot], number: Number) -> Option<usize> {
    slots.iter().position(|slot| slot.number == Some(number))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(value: i64) -> Number {
        Number::new(value).unwrap()
    }

    fn bet(user: &str, number: i64) -> Bet {
        Bet::new(user, format!("name-{user}"), n(number))
    }

    #[test]
    fn test_dedup_keeps_first_bettor() {
        let bets = vec![bet("A", 5), bet("B", 5), bet("A", 7)];
        let slots = assign_slots(&bets, 6);

        assert_eq!(slots.len(), 6);
        assert_eq!(slots[0].number, Some(n(5)));
        assert_eq!(slots[0].username, "name-A");
        assert_eq!(slots[1].number, Some(n(7)));
        assert!(slots[2..].iter().all(BoardSlot::is_empty));

        assert_eq!(my_bets(&bets, "A"), vec![n(5), n(7)]);
        assert_eq!(my_bets(&bets, "B"), vec![n(5)]);
        assert!(my_bets(&bets, "C").is_empty());
    }

    #[test]
    fn test_slots_follow_arrival_order() {
        let bets = vec![bet("A", 30), bet("B", 2), bet("C", 30), bet("D", 11)];
        let numbers: Vec<_> = assign_slots(&bets, 6)
            .into_iter()
            .filter_map(|slot| slot.number)
            .collect();
        assert_eq!(numbers, vec![n(30), n(2), n(11)]);
    }

    #[test]
    fn test_capacity_overflow_is_not_displayed() {
        let bets: Vec<_> = (0..8).map(|i| bet("X", i)).collect();
        let slots = assign_slots(&bets, 6);
        assert_eq!(slots.len(), 6);
        assert_eq!(slots[5].number, Some(n(5)));
        assert_eq!(slot_of(&slots, n(7)), None);
        assert_eq!(overflow(&bets, 6), 2);

        // The panel still lists every bet.
        assert_eq!(my_bets(&bets, "X").len(), 8);
    }

    #[test]
    fn test_repeated_own_bets_are_all_listed() {
        let bets = vec![bet("A", 3), bet("B", 3), bet("A", 3)];
        assert_eq!(my_bets(&bets, "A"), vec![n(3), n(3)]);
        assert_eq!(overflow(&bets, 6), 0);
        assert_eq!(slot_of(&assign_slots(&bets, 6), n(3)), Some(0));
    }
}
