//! Order normalization for drag-to-reorder lists.
//!
//! The editor hands back the list in its new visual order. Positions are
//! normalized to `0..n-1`, and only entries whose stored `order` differs
//! from their new index need an update call.

use crate::content::Ordered;

/// One `update*Order(id, new_order)` call to issue against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    pub id: String,
    pub new_order: u64,
}

/// Compute the order updates that renumber `reordered` to `0..n-1`.
///
/// Updates come back in list order; callers apply them sequentially.
/// An already-normalized list yields no updates.
pub fn plan_reorder<T: Ordered>(reordered: &[T]) -> Vec<OrderUpdate> {
    reordered
        .iter()
        .enumerate()
        .filter(|(idx, item)| item.order() != *idx as u64)
        .map(|(idx, item)| OrderUpdate {
            id: item.id().to_string(),
            new_order: idx as u64,
        })
        .collect()
}

/// Items sorted by their `order` field. Ties keep their input order.
pub fn sorted_by_order<T: Ordered>(items: &[T]) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by_key(|item| item.order());
    sorted
}

/// Move the element at `from` to position `to`, as a drag-and-drop does.
///
/// Out-of-range indices leave the list unchanged.
pub fn move_item<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut moved = items.to_vec();
    if from >= moved.len() || to >= moved.len() || from == to {
        return moved;
    }
    let item = moved.remove(from);
    moved.insert(to, item);
    moved
}

/// Order assigned to a newly appended entity.
pub fn next_order<T>(items: &[T]) -> u64 {
    items.len() as u64
}
