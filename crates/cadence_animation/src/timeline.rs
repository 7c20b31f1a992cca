//! Timeline composition
//!
//! Flattens a declarative entry list (animations, concurrent groups and
//! nested sequences) into a flat queue of positioned animations.
//!
//! Composition is pure: it never touches targets. The span of each
//! animation comes from a `measure` callback, which the runtime backs with
//! the tween builder and tests back with a fixed duration.

use crate::definition::{AnimationDefinition, Entry};
use crate::offset::resolve_start;
use std::rc::Rc;

/// An animation with its resolved execution window
pub struct PositionedAnimation<T> {
    /// Position in the flat queue
    pub index: usize,
    pub definition: Rc<AnimationDefinition<T>>,
    /// Timeline-relative start in milliseconds
    pub execution_start: f64,
    /// Timeline-relative end in milliseconds
    pub execution_end: f64,
    /// Absolute entries float over the timeline without moving the cursor
    pub is_absolute_offset: bool,
}

impl<T> PositionedAnimation<T> {
    pub fn span(&self) -> f64 {
        self.execution_end - self.execution_start
    }
}

impl<T> Clone for PositionedAnimation<T> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            definition: Rc::clone(&self.definition),
            execution_start: self.execution_start,
            execution_end: self.execution_end,
            is_absolute_offset: self.is_absolute_offset,
        }
    }
}

/// The result of composing a list of entries
pub struct Composition<T> {
    pub queue: Vec<PositionedAnimation<T>>,
    /// Furthest point reached by non-absolute entries
    pub relative_end: f64,
    /// Total span of the timeline
    pub execution_end: f64,
    /// Queue index of the entry that determines `execution_end`
    pub longest_running: Option<usize>,
}

impl<T> Default for Composition<T> {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            relative_end: 0.0,
            execution_end: 0.0,
            longest_running: None,
        }
    }
}

impl<T> Clone for Composition<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            relative_end: self.relative_end,
            execution_end: self.execution_end,
            longest_running: self.longest_running,
        }
    }
}

/// Compose `entries` into a timing table rooted at time 0
///
/// `measure` is called exactly once per animation, in queue order.
pub fn compose<T, M>(entries: &[Entry<T>], measure: M) -> Composition<T>
where
    M: FnMut(&AnimationDefinition<T>) -> f64,
{
    let mut composition = Composition::default();
    composition.extend(entries, measure);
    composition
}

impl<T> Composition<T> {
    /// Merge more top-level entries into this composition
    ///
    /// New entries chain on from the current relative cursor, so composing
    /// `a` then extending with `b` positions everything exactly like
    /// composing `a ++ b` in one pass.
    pub fn extend<M>(&mut self, entries: &[Entry<T>], mut measure: M)
    where
        M: FnMut(&AnimationDefinition<T>) -> f64,
    {
        let cursor = self.relative_end;
        self.relative_end = self.place_sequence(entries, 0.0, cursor, &mut measure);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Entries one after another; returns the cursor after the last one
    fn place_sequence<M>(&mut self, entries: &[Entry<T>], anchor: f64, cursor: f64, measure: &mut M) -> f64
    where
        M: FnMut(&AnimationDefinition<T>) -> f64,
    {
        entries
            .iter()
            .fold(cursor, |cursor, entry| self.place(entry, anchor, cursor, measure))
    }

    /// Entries all starting from `cursor`; returns the latest non-absolute end
    fn place_group<M>(&mut self, entries: &[Entry<T>], cursor: f64, measure: &mut M) -> f64
    where
        M: FnMut(&AnimationDefinition<T>) -> f64,
    {
        entries.iter().fold(cursor, |end, entry| {
            let member_end = self.place(entry, cursor, cursor, measure);
            end.max(member_end)
        })
    }

    fn place<M>(&mut self, entry: &Entry<T>, anchor: f64, cursor: f64, measure: &mut M) -> f64
    where
        M: FnMut(&AnimationDefinition<T>) -> f64,
    {
        match entry {
            Entry::Animation(definition) => {
                let span = measure(definition).max(0.0);
                let placement = resolve_start(cursor, anchor, definition.offset, definition.delay);
                let end = placement.start + span;
                self.push(PositionedAnimation {
                    index: self.queue.len(),
                    definition: Rc::clone(definition),
                    execution_start: placement.start,
                    execution_end: end,
                    is_absolute_offset: placement.absolute,
                });
                if placement.absolute {
                    cursor
                } else {
                    cursor.max(end)
                }
            }
            Entry::Group(entries) => self.place_group(entries, cursor, measure),
            Entry::Sequence(sequence) => {
                let placement = resolve_start(cursor, anchor, sequence.offset, 0.0);
                let end = self.place_sequence(&sequence.entries, placement.start, placement.start, measure);
                if placement.absolute {
                    cursor
                } else {
                    cursor.max(end)
                }
            }
        }
    }

    fn push(&mut self, positioned: PositionedAnimation<T>) {
        // Later entries win ties for the longest-running slot
        if self.longest_running.is_none() || positioned.execution_end >= self.execution_end {
            self.execution_end = positioned.execution_end;
            self.longest_running = Some(positioned.index);
        }
        self.queue.push(positioned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Sequence;
    use crate::offset::Offset;

    type Def = AnimationDefinition<&'static str>;

    fn anim(duration: f64) -> Entry<&'static str> {
        Def::idle().duration(duration).into()
    }

    fn by_duration(def: &Def) -> f64 {
        def.duration.unwrap_or(0.0)
    }

    fn windows(c: &Composition<&'static str>) -> Vec<(f64, f64)> {
        c.queue
            .iter()
            .map(|p| (p.execution_start, p.execution_end))
            .collect()
    }

    #[test]
    fn test_chained_entries_run_back_to_back() {
        let c = compose(&[anim(100.0), anim(200.0), anim(50.0)], by_duration);
        assert_eq!(windows(&c), vec![(0.0, 100.0), (100.0, 300.0), (300.0, 350.0)]);
        assert_eq!(c.relative_end, 350.0);
        assert_eq!(c.execution_end, 350.0);
        assert_eq!(c.longest_running, Some(2));
    }

    #[test]
    fn test_relative_and_absolute_offsets() {
        let entries = [
            anim(1000.0),
            Def::idle().duration(500.0).offset(Offset::parse("-=200").unwrap()).into(),
            Def::idle().duration(3000.0).offset(100.0).into(),
            anim(100.0),
        ];
        let c = compose(&entries, by_duration);
        assert_eq!(
            windows(&c),
            vec![(0.0, 1000.0), (800.0, 1300.0), (100.0, 3100.0), (1300.0, 1400.0)]
        );
        // The absolute entry floats: it sets the span but not the cursor
        assert_eq!(c.relative_end, 1400.0);
        assert_eq!(c.execution_end, 3100.0);
        assert_eq!(c.longest_running, Some(2));
        assert!(c.queue[2].is_absolute_offset);
    }

    #[test]
    fn test_delay_adds_to_start() {
        let entries = [anim(100.0), Def::idle().duration(100.0).delay(50.0).into()];
        let c = compose(&entries, by_duration);
        assert_eq!(windows(&c), vec![(0.0, 100.0), (150.0, 250.0)]);
    }

    #[test]
    fn test_nested_group_resumes_after_latest_member() {
        let entries = [anim(1000.0), Entry::group([anim(300.0)]), anim(200.0)];
        let c = compose(&entries, by_duration);
        assert_eq!(windows(&c), vec![(0.0, 1000.0), (1000.0, 1300.0), (1300.0, 1500.0)]);
        assert_eq!(c.relative_end, 1500.0);
    }

    #[test]
    fn test_group_members_start_together() {
        let entries = [
            anim(100.0),
            Entry::group([
                anim(300.0),
                anim(500.0),
                Def::idle().duration(50.0).offset(Offset::parse("+=20").unwrap()).into(),
                // Absolute inside a group anchors at the group's start
                Def::idle().duration(900.0).offset(10.0).into(),
            ]),
            anim(10.0),
        ];
        let c = compose(&entries, by_duration);
        assert_eq!(
            windows(&c),
            vec![
                (0.0, 100.0),
                (100.0, 400.0),
                (100.0, 600.0),
                (120.0, 170.0),
                (110.0, 1010.0),
                (600.0, 610.0),
            ]
        );
        assert_eq!(c.longest_running, Some(4));
    }

    #[test]
    fn test_nested_sequence_is_reanchored() {
        let child = Sequence::new()
            .then(anim(100.0))
            .then(Def::idle().duration(100.0).offset(50.0))
            .then(anim(100.0));
        let entries = [anim(1000.0), child.into(), anim(10.0)];
        let c = compose(&entries, by_duration);
        assert_eq!(
            windows(&c),
            vec![
                (0.0, 1000.0),
                (1000.0, 1100.0),
                (1050.0, 1150.0),
                (1100.0, 1200.0),
                (1200.0, 1210.0),
            ]
        );
    }

    #[test]
    fn test_absolute_sequence_does_not_move_cursor() {
        let child = Sequence::new().then(anim(100.0)).then(anim(100.0)).offset(500.0);
        let entries = [anim(100.0), child.into(), anim(100.0)];
        let c = compose(&entries, by_duration);
        assert_eq!(
            windows(&c),
            vec![(0.0, 100.0), (500.0, 600.0), (600.0, 700.0), (100.0, 200.0)]
        );
        assert_eq!(c.relative_end, 200.0);
        assert_eq!(c.execution_end, 700.0);
    }

    #[test]
    fn test_ties_go_to_later_entry() {
        let entries = [Entry::group([anim(300.0), anim(300.0)])];
        let c = compose(&entries, by_duration);
        assert_eq!(c.longest_running, Some(1));
    }

    #[test]
    fn test_incremental_merge_matches_single_pass() {
        let first = vec![
            anim(100.0),
            Entry::group([anim(300.0), anim(50.0)]),
            Def::idle().duration(40.0).offset(Offset::parse("-=30").unwrap()).into(),
        ];
        let second = vec![
            Def::idle().duration(500.0).offset(20.0).into(),
            anim(70.0),
            Sequence::new().then(anim(10.0)).into(),
        ];

        let all: Vec<_> = first.iter().chain(second.iter()).cloned().collect();
        let single = compose(&all, by_duration);

        let mut incremental = compose(&first, by_duration);
        incremental.extend(&second, by_duration);

        assert_eq!(windows(&single), windows(&incremental));
        assert_eq!(single.relative_end, incremental.relative_end);
        assert_eq!(single.execution_end, incremental.execution_end);
        assert_eq!(single.longest_running, incremental.longest_running);
    }

    #[test]
    fn test_composition_is_deterministic() {
        let entries = vec![
            anim(120.0),
            Entry::group([anim(80.0), Def::idle().duration(10.0).offset(5.0).into()]),
            Sequence::new().then(anim(30.0)).into(),
        ];
        let a = compose(&entries, by_duration);
        let b = compose(&entries, by_duration);
        assert_eq!(windows(&a), windows(&b));
    }

    #[test]
    fn test_measure_called_once_per_animation_in_queue_order() {
        let mut seen = Vec::new();
        let entries = [anim(1.0), Entry::group([anim(2.0), anim(3.0)]), anim(4.0)];
        compose(&entries, |def| {
            seen.push(def.duration.unwrap_or(0.0));
            0.0
        });
        assert_eq!(seen, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_empty_composition() {
        let c = compose::<&'static str, _>(&[], by_duration);
        assert!(c.is_empty());
        assert_eq!(c.execution_end, 0.0);
        assert_eq!(c.longest_running, None);
    }
}
