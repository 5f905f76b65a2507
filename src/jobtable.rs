//! The job table: a slotted arena addressed by stable slot index, so a
//! job's id (`slot + 1`, per the one-based numbering `jobs`/`fg %N` use)
//! never changes for as long as the job occupies that slot.
//!
//! Grounded on the original's array-backed job table (`jobs.c`'s
//! `increasebuf`/`decreasebuf`), but deliberately not copying its
//! compacting shrink: see the module-level note on [`JobTable::reclaim`].

use crate::job::Job;

const MIN_SLOTS: usize = 4;

enum Slot {
    Free { next_free: Option<usize> },
    Occupied(Job),
}

/// Arena of jobs, indexed by a stable 0-based slot that backs the
/// 1-based job ids exposed to the user (`%N` == slot `N - 1`).
pub struct JobTable {
    slots: Vec<Slot>,
    free_head: Option<usize>,
    free_count: usize,
}

impl Default for JobTable {
    fn default() -> JobTable {
        JobTable::new()
    }
}

impl JobTable {
    pub fn new() -> JobTable {
        let mut slots = Vec::with_capacity(MIN_SLOTS);
        for i in 0..MIN_SLOTS {
            slots.push(Slot::Free {
                next_free: if i + 1 < MIN_SLOTS { Some(i + 1) } else { None },
            });
        }
        JobTable {
            slots,
            free_head: Some(0),
            free_count: MIN_SLOTS,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.len() - self.free_count
    }

    pub fn free_count(&self) -> usize {
        self.free_count
    }

    fn grow(&mut self) {
        let old_len = self.slots.len();
        let new_len = old_len * 2;
        for i in old_len..new_len {
            self.slots.push(Slot::Free {
                next_free: if i + 1 < new_len { Some(i + 1) } else { self.free_head },
            });
            self.free_head = Some(i);
        }
        self.free_count += new_len - old_len;
    }

    /// Attempts to halve the table's capacity. This only ever removes
    /// *trailing* slots that are currently free; it never relocates an
    /// occupied slot, which is what keeps job ids stable across a shrink.
    /// If any occupied slot lives at or beyond the halved size, the table
    /// is left at its current size and tried again on the next call.
    fn reclaim(&mut self) {
        if self.slots.len() <= MIN_SLOTS {
            return;
        }
        let candidate = (self.slots.len() / 2).max(MIN_SLOTS);
        let safe = (candidate..self.slots.len())
            .all(|i| matches!(self.slots[i], Slot::Free { .. }));
        if !safe {
            return;
        }
        self.slots.truncate(candidate);
        self.rebuild_free_list();
    }

    fn rebuild_free_list(&mut self) {
        self.free_head = None;
        self.free_count = 0;
        for i in (0..self.slots.len()).rev() {
            if matches!(self.slots[i], Slot::Free { .. }) {
                self.slots[i] = Slot::Free {
                    next_free: self.free_head,
                };
                self.free_head = Some(i);
                self.free_count += 1;
            }
        }
    }

    /// Inserts `job`, growing the table first if fewer than half its
    /// slots are free, and returns its 1-based job id.
    pub fn make_job(&mut self, job: Job) -> i64 {
        if self.free_count * 2 < self.slots.len() || self.free_head.is_none() {
            self.grow();
        }
        let slot = self.free_head.expect("grow() guarantees a free slot");
        self.free_head = match self.slots[slot] {
            Slot::Free { next_free } => next_free,
            Slot::Occupied(_) => unreachable!("free list pointed at an occupied slot"),
        };
        self.slots[slot] = Slot::Occupied(job);
        self.free_count -= 1;
        (slot + 1) as i64
    }

    /// Removes the job at `id`, then attempts to shrink the table if the
    /// free ratio has crossed 3/4.
    pub fn free_job(&mut self, id: i64) -> Option<Job> {
        let idx = self.index_of(id)?;
        let removed = match std::mem::replace(
            &mut self.slots[idx],
            Slot::Free {
                next_free: self.free_head,
            },
        ) {
            Slot::Occupied(job) => Some(job),
            Slot::Free { .. } => None,
        };
        if removed.is_some() {
            self.free_head = Some(idx);
            self.free_count += 1;
            if self.free_count * 4 >= self.slots.len() * 3 {
                self.reclaim();
            }
        } else {
            // slot was already free; undo the unconditional replace above
            self.slots[idx] = Slot::Free { next_free: None };
            self.rebuild_free_list();
        }
        removed
    }

    fn index_of(&self, id: i64) -> Option<usize> {
        if id < 1 {
            return None;
        }
        let idx = (id - 1) as usize;
        if idx < self.slots.len() {
            Some(idx)
        } else {
            None
        }
    }

    pub fn get(&self, id: i64) -> Option<&Job> {
        match self.slots.get(self.index_of(id)?)? {
            Slot::Occupied(job) => Some(job),
            Slot::Free { .. } => None,
        }
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut Job> {
        let idx = self.index_of(id)?;
        match self.slots.get_mut(idx)? {
            Slot::Occupied(job) => Some(job),
            Slot::Free { .. } => None,
        }
    }

    /// Visits every occupied job along with its 1-based id, in slot order.
    pub fn for_each(&self, mut f: impl FnMut(i64, &Job)) {
        for (i, slot) in self.slots.iter().enumerate() {
            if let Slot::Occupied(job) = slot {
                f((i + 1) as i64, job);
            }
        }
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(i64, &mut Job)) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let Slot::Occupied(job) = slot {
                f((i + 1) as i64, job);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.occupied_count() == 0
    }

    /// Whether any occupied job has a stopped process, per the original's
    /// `suspjobexist()` — used to gate the EOF "suspended jobs" warning,
    /// which must not fire for jobs that are merely running in the
    /// background.
    pub fn any_stopped(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| matches!(slot, Slot::Occupied(job) if job.any_stopped()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(cmd: &str) -> Job {
        Job::new(1, cmd.into(), false)
    }

    #[test]
    fn fresh_table_has_min_slots_free() {
        let t = JobTable::new();
        assert_eq!(t.len(), MIN_SLOTS);
        assert_eq!(t.free_count(), MIN_SLOTS);
    }

    #[test]
    fn make_job_returns_one_based_ids() {
        let mut t = JobTable::new();
        let id = t.make_job(job("a"));
        assert_eq!(id, 1);
        assert!(t.get(id).is_some());
    }

    #[test]
    fn ids_stay_stable_across_growth() {
        let mut t = JobTable::new();
        let mut ids = Vec::new();
        for i in 0..10 {
            ids.push(t.make_job(job(&format!("job{i}"))));
        }
        assert!(t.len() > MIN_SLOTS);
        for (i, &id) in ids.iter().enumerate() {
            assert_eq!(t.get(id).unwrap().cmd, format!("job{i}"));
        }
    }

    #[test]
    fn free_job_does_not_renumber_survivors() {
        let mut t = JobTable::new();
        let a = t.make_job(job("a"));
        let b = t.make_job(job("b"));
        let c = t.make_job(job("c"));
        t.free_job(b);
        assert_eq!(t.get(a).unwrap().cmd, "a");
        assert_eq!(t.get(c).unwrap().cmd, "c");
        assert!(t.get(b).is_none());
    }

    #[test]
    fn shrink_only_trims_trailing_free_capacity() {
        let mut t = JobTable::new();
        let ids: Vec<i64> = (0..16).map(|i| t.make_job(job(&format!("j{i}")))).collect();
        let grown_len = t.len();
        assert!(grown_len > MIN_SLOTS);

        // Free everything except a job sitting in a low slot: nothing
        // prevents shrinking all the way down past it.
        let keep = ids[0];
        for &id in &ids[1..] {
            t.free_job(id);
        }
        assert!(t.get(keep).is_some());
        assert_eq!(t.get(keep).unwrap().cmd, "j0");

        // Occupy a high slot so a shrink candidate below it is unsafe.
        let mut t2 = JobTable::new();
        let ids2: Vec<i64> = (0..16).map(|i| t2.make_job(job(&format!("k{i}")))).collect();
        let last = *ids2.last().unwrap();
        for &id in &ids2[..ids2.len() - 1] {
            t2.free_job(id);
        }
        // The last-made job occupies a high slot index; the table must
        // not shrink below it, and `last`'s id must still resolve.
        assert!(t2.get(last).is_some());
        assert!(t2.len() as i64 >= last);
    }

    #[test]
    fn free_count_tracks_occupied() {
        let mut t = JobTable::new();
        let a = t.make_job(job("a"));
        assert_eq!(t.occupied_count(), 1);
        t.free_job(a);
        assert_eq!(t.occupied_count(), 0);
    }

    #[test]
    fn for_each_visits_in_slot_order_with_correct_ids() {
        let mut t = JobTable::new();
        let a = t.make_job(job("a"));
        let b = t.make_job(job("b"));
        let mut seen = Vec::new();
        t.for_each(|id, j| seen.push((id, j.cmd.clone())));
        assert_eq!(seen, vec![(a, "a".to_string()), (b, "b".to_string())]);
    }
}
