//! Posting list operations using Roaring bitmaps.

use roaring::RoaringBitmap;

/// A posting list wrapping a Roaring bitmap of file IDs.
///
/// Roaring bitmaps are sorted and deduplicated by construction, which is
/// exactly the posting list invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingList {
    pub bitmap: RoaringBitmap,
}

impl PostingList {
    /// Create an empty posting list.
    pub fn new() -> Self {
        PostingList {
            bitmap: RoaringBitmap::new(),
        }
    }

    /// Create a posting list from a Roaring bitmap.
    pub fn from_bitmap(bitmap: RoaringBitmap) -> Self {
        PostingList { bitmap }
    }

    /// Insert a file ID.
    pub fn insert(&mut self, file_id: u32) {
        self.bitmap.insert(file_id);
    }

    /// Number of file IDs in this posting list.
    pub fn len(&self) -> u64 {
        self.bitmap.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    /// Iterate over file IDs in ascending order.
    pub fn iter(&self) -> roaring::bitmap::Iter<'_> {
        self.bitmap.iter()
    }

    /// Convert to a Vec of file IDs.
    pub fn to_vec(&self) -> Vec<u32> {
        self.bitmap.iter().collect()
    }

    /// Translate every file ID through `remap`.
    ///
    /// IDs mapped to `None` (or beyond the table) are dropped.
    pub fn remap(&self, remap: &[Option<u32>]) -> PostingList {
        let mut bitmap = RoaringBitmap::new();
        for id in self.bitmap.iter() {
            if let Some(Some(new_id)) = remap.get(id as usize) {
                bitmap.insert(*new_id);
            }
        }
        PostingList::from_bitmap(bitmap)
    }

    /// Shift every file ID up by `delta`.
    ///
    /// Returns `None` if any shifted ID would overflow `u32`.
    pub fn offset(&self, delta: u32) -> Option<PostingList> {
        if delta == 0 {
            return Some(self.clone());
        }
        let mut bitmap = RoaringBitmap::new();
        for id in self.bitmap.iter() {
            bitmap.insert(id.checked_add(delta)?);
        }
        Some(PostingList::from_bitmap(bitmap))
    }
}

impl Default for PostingList {
    fn default() -> Self {
        Self::new()
    }
}

/// Intersect multiple posting lists (AND operation).
///
/// Returns an empty posting list if any input is empty.
pub fn intersect(lists: &[PostingList]) -> PostingList {
    if lists.is_empty() {
        return PostingList::new();
    }

    let mut result = lists[0].bitmap.clone();
    for list in &lists[1..] {
        result &= &list.bitmap;
        if result.is_empty() {
            break;
        }
    }

    PostingList::from_bitmap(result)
}

/// Union multiple posting lists (OR operation).
pub fn union(lists: &[PostingList]) -> PostingList {
    if lists.is_empty() {
        return PostingList::new();
    }

    let mut result = lists[0].bitmap.clone();
    for list in &lists[1..] {
        result |= &list.bitmap;
    }

    PostingList::from_bitmap(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[u32]) -> PostingList {
        PostingList::from_bitmap(ids.iter().copied().collect())
    }

    #[test]
    fn test_intersect_two_lists() {
        let result = intersect(&[list(&[1, 2, 3]), list(&[2, 3, 4])]);
        assert_eq!(result.to_vec(), vec![2, 3]);
    }

    #[test]
    fn test_intersect_with_empty() {
        let result = intersect(&[list(&[1, 2]), PostingList::new()]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_intersect_disjoint() {
        assert!(intersect(&[list(&[1, 2]), list(&[3, 4])]).is_empty());
    }

    #[test]
    fn test_union_posting_lists() {
        let result = union(&[list(&[1, 2]), list(&[2, 3])]);
        assert_eq!(result.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(intersect(&[]).is_empty());
        assert!(union(&[]).is_empty());
    }

    #[test]
    fn test_remap_drops_pruned_ids() {
        let remap = vec![Some(0), None, Some(1), Some(2)];
        assert_eq!(list(&[0, 1, 3, 9]).remap(&remap).to_vec(), vec![0, 2]);
    }

    #[test]
    fn test_offset() {
        assert_eq!(list(&[0, 4]).offset(10).unwrap().to_vec(), vec![10, 14]);
        assert!(list(&[u32::MAX]).offset(1).is_none());
    }

    #[test]
    fn test_posting_list_len() {
        let mut pl = PostingList::new();
        assert_eq!(pl.len(), 0);
        pl.insert(1);
        pl.insert(1);
        pl.insert(2);
        assert_eq!(pl.len(), 2);
    }
}
