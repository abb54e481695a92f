use crate::types::{
    segments, ClassroomId, Day, LabRoomId, SessionId, TeacherId, TimeOfDay, SEGMENT_MINUTES,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A bookable resource. One index serves all three kinds so overlap
/// detection is a single set-membership question everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Teacher(TeacherId),
    Classroom(ClassroomId),
    LabRoom(LabRoomId),
}

impl Resource {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Resource::Teacher(_) => "teacher",
            Resource::Classroom(_) => "classroom",
            Resource::LabRoom(_) => "lab room",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Teacher(id) => write!(f, "teacher {id}"),
            Resource::Classroom(id) => write!(f, "classroom {id}"),
            Resource::LabRoom(id) => write!(f, "lab room {id}"),
        }
    }
}

/// A rejected reservation: which segment of which resource was taken
#[derive(Debug, Clone)]
pub struct OccupancyClash {
    pub resource: Resource,
    pub day: Day,
    pub segment_start: TimeOfDay,
    pub occupant: SessionId,
}

impl fmt::Display for OccupancyClash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} already occupied on {} at {} by session {}",
            self.resource, self.day, self.segment_start, self.occupant
        )
    }
}

type SlotKey = (Resource, Day, u16);

/// Occupancy index at 30-minute granularity.
///
/// Maps `(resource, day, half-hour segment)` to the sessions holding
/// it. `reserve` keeps pipeline schedules conflict-free by refusing
/// overlaps; `occupy` rebuilds the index from an arbitrary session set
/// (refiner working copies may legitimately hold conflicts mid-search,
/// and the index then answers "how many" instead of "whether").
#[derive(Debug, Clone, Default)]
pub struct ResourceOccupancy {
    map: BTreeMap<SlotKey, Vec<SessionId>>,
}

impl ResourceOccupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// True iff every covered segment is unoccupied
    pub fn is_free(&self, resource: &Resource, day: Day, start: TimeOfDay, end: TimeOfDay) -> bool {
        self.first_clash(resource, day, start, end).is_none()
    }

    /// First occupied segment in the window, if any
    pub fn first_clash(
        &self,
        resource: &Resource,
        day: Day,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Option<OccupancyClash> {
        for seg in segments(start, end) {
            let key = (resource.clone(), day, seg);
            if let Some(owners) = self.map.get(&key) {
                if let Some(occupant) = owners.first() {
                    return Some(OccupancyClash {
                        resource: resource.clone(),
                        day,
                        segment_start: TimeOfDay(seg * SEGMENT_MINUTES),
                        occupant: occupant.clone(),
                    });
                }
            }
        }
        None
    }

    /// Insert all covered segments, or none: fails on the first
    /// already-occupied segment without touching the index.
    pub fn reserve(
        &mut self,
        resource: &Resource,
        day: Day,
        start: TimeOfDay,
        end: TimeOfDay,
        owner: &SessionId,
    ) -> Result<(), OccupancyClash> {
        if let Some(clash) = self.first_clash(resource, day, start, end) {
            return Err(clash);
        }
        self.occupy(resource, day, start, end, owner);
        Ok(())
    }

    /// Insert regardless of existing occupants (index-rebuild path)
    pub fn occupy(
        &mut self,
        resource: &Resource,
        day: Day,
        start: TimeOfDay,
        end: TimeOfDay,
        owner: &SessionId,
    ) {
        for seg in segments(start, end) {
            self.map
                .entry((resource.clone(), day, seg))
                .or_default()
                .push(owner.clone());
        }
    }

    /// Remove the owner from every covered segment
    pub fn release(
        &mut self,
        resource: &Resource,
        day: Day,
        start: TimeOfDay,
        end: TimeOfDay,
        owner: &SessionId,
    ) {
        for seg in segments(start, end) {
            let key = (resource.clone(), day, seg);
            if let Some(owners) = self.map.get_mut(&key) {
                owners.retain(|o| o != owner);
                if owners.is_empty() {
                    self.map.remove(&key);
                }
            }
        }
    }

    /// Distinct conflicting session pairs per resource-day.
    ///
    /// The pair identity collapses multiple clashing segments of the
    /// same two sessions into one conflict.
    pub fn overlap_pairs(&self) -> BTreeSet<(Resource, Day, SessionId, SessionId)> {
        let mut pairs = BTreeSet::new();
        for ((resource, day, _), owners) in &self.map {
            if owners.len() < 2 {
                continue;
            }
            for i in 0..owners.len() {
                for j in (i + 1)..owners.len() {
                    let (a, b) = if owners[i] <= owners[j] {
                        (owners[i].clone(), owners[j].clone())
                    } else {
                        (owners[j].clone(), owners[i].clone())
                    };
                    pairs.insert((resource.clone(), *day, a, b));
                }
            }
        }
        pairs
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn teacher(id: &str) -> Resource {
        Resource::Teacher(TeacherId(id.to_string()))
    }

    fn sid(id: &str) -> SessionId {
        SessionId(id.to_string())
    }

    fn hm(h: u16, m: u16) -> TimeOfDay {
        TimeOfDay::from_hm(h, m)
    }

    #[test]
    fn half_hour_offset_still_clashes() {
        // A 10:00-11:00 booking must block a 10:30-11:30 attempt via
        // the shared 10:30 segment.
        let mut occ = ResourceOccupancy::new();
        let room = Resource::Classroom(ClassroomId("c1".into()));
        occ.reserve(&room, Day::Monday, hm(10, 0), hm(11, 0), &sid("a"))
            .unwrap();

        let clash = occ
            .reserve(&room, Day::Monday, hm(10, 30), hm(11, 30), &sid("b"))
            .unwrap_err();
        assert_eq!(clash.segment_start, hm(10, 30));
        assert_eq!(clash.occupant, sid("a"));
    }

    #[test]
    fn failed_reserve_leaves_index_untouched() {
        let mut occ = ResourceOccupancy::new();
        let t = teacher("t1");
        occ.reserve(&t, Day::Monday, hm(11, 0), hm(11, 30), &sid("a"))
            .unwrap();
        // 10:00-12:00 covers the occupied 11:00 segment
        assert!(occ
            .reserve(&t, Day::Monday, hm(10, 0), hm(12, 0), &sid("b"))
            .is_err());
        // The earlier free segments must not have been claimed
        assert!(occ.is_free(&t, Day::Monday, hm(10, 0), hm(11, 0)));
    }

    #[test]
    fn back_to_back_windows_do_not_clash() {
        let mut occ = ResourceOccupancy::new();
        let t = teacher("t1");
        occ.reserve(&t, Day::Friday, hm(9, 0), hm(10, 0), &sid("a"))
            .unwrap();
        assert!(occ
            .reserve(&t, Day::Friday, hm(10, 0), hm(11, 0), &sid("b"))
            .is_ok());
    }

    #[test]
    fn release_frees_only_the_owner() {
        let mut occ = ResourceOccupancy::new();
        let t = teacher("t1");
        occ.occupy(&t, Day::Monday, hm(9, 0), hm(10, 0), &sid("a"));
        occ.occupy(&t, Day::Monday, hm(9, 0), hm(10, 0), &sid("b"));
        occ.release(&t, Day::Monday, hm(9, 0), hm(10, 0), &sid("a"));
        assert!(!occ.is_free(&t, Day::Monday, hm(9, 0), hm(10, 0)));
        occ.release(&t, Day::Monday, hm(9, 0), hm(10, 0), &sid("b"));
        assert!(occ.is_free(&t, Day::Monday, hm(9, 0), hm(10, 0)));
    }

    #[test]
    fn overlap_pairs_deduplicate_segments() {
        let mut occ = ResourceOccupancy::new();
        let t = teacher("t1");
        // Two sessions clash across four shared segments; one pair
        occ.occupy(&t, Day::Monday, hm(10, 0), hm(12, 0), &sid("a"));
        occ.occupy(&t, Day::Monday, hm(10, 0), hm(12, 0), &sid("b"));
        assert_eq!(occ.overlap_pairs().len(), 1);
    }

    proptest! {
        #[test]
        fn reserve_then_release_restores_freeness(
            seg_start in 16u16..=32,
            half_hours in 1u16..=4,
        ) {
            let mut occ = ResourceOccupancy::new();
            let t = teacher("t1");
            let start = TimeOfDay(seg_start * SEGMENT_MINUTES);
            let end = start.plus_minutes(half_hours * SEGMENT_MINUTES);
            occ.reserve(&t, Day::Wednesday, start, end, &sid("x")).unwrap();
            prop_assert!(!occ.is_free(&t, Day::Wednesday, start, end));
            occ.release(&t, Day::Wednesday, start, end, &sid("x"));
            prop_assert!(occ.is_free(&t, Day::Wednesday, start, end));
            prop_assert!(occ.is_empty());
        }
    }
}
