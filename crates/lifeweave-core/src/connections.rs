//! Pairwise relatedness between a user's life events.
//!
//! Quadratic in the event count; callers hand in a bounded snapshot (one
//! user's timeline), which keeps the pair loop small in practice.

use lifeweave_schema::{ConnectionKind, EventConnection, LifeEvent};

const TEMPORAL_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct ConnectionAnalyzer {
    threshold: f32,
    cap: usize,
}

impl ConnectionAnalyzer {
    pub fn new(threshold: f32, cap: usize) -> Self {
        Self { threshold, cap }
    }

    /// Scores every unordered pair and keeps the strongest connections
    /// above the threshold, strongest first. Equal strengths order by the
    /// canonical id pair, lower pair first.
    pub fn analyze(&self, events: &[LifeEvent]) -> Vec<EventConnection> {
        let mut connections = Vec::new();
        for (i, a) in events.iter().enumerate() {
            for b in &events[i + 1..] {
                let (strength, kinds) = score_pair(a, b);
                if strength > self.threshold {
                    let (low, high) = if a.id < b.id { (a.id, b.id) } else { (b.id, a.id) };
                    connections.push(EventConnection {
                        event_a: low,
                        event_b: high,
                        strength,
                        kinds,
                    });
                }
            }
        }

        connections.sort_by(|x, y| {
            y.strength
                .partial_cmp(&x.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| (x.event_a, x.event_b).cmp(&(y.event_a, y.event_b)))
        });
        connections.truncate(self.cap);
        connections
    }
}

impl Default for ConnectionAnalyzer {
    fn default() -> Self {
        Self::new(0.3, 10)
    }
}

/// Independent contributions summed per pair. Symmetric by construction.
fn score_pair(a: &LifeEvent, b: &LifeEvent) -> (f32, Vec<ConnectionKind>) {
    let mut strength = 0.0f32;
    let mut kinds = Vec::new();

    let day_gap = (a.event_date - b.event_date).num_days().abs();
    if day_gap <= TEMPORAL_WINDOW_DAYS {
        strength += 0.3;
        kinds.push(ConnectionKind::TemporalProximity);
    }

    if !a.life_domains.is_empty() && !b.life_domains.is_empty() {
        let shared = a.life_domains.intersection(&b.life_domains).count();
        if shared > 0 {
            strength += 0.4 * shared as f32;
            kinds.push(ConnectionKind::SharedDomain);
        }
    }

    match (a.emotional_state, b.emotional_state) {
        (Some(left), Some(right)) if left == right => {
            strength += 0.2;
            kinds.push(ConnectionKind::SimilarEmotion);
        }
        _ => {}
    }

    if let (Some(left), Some(right)) = (a.importance_level, b.importance_level) {
        if (i16::from(left) - i16::from(right)).abs() <= 2 {
            strength += 0.1;
            kinds.push(ConnectionKind::SimilarImportance);
        }
    }

    (strength, kinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lifeweave_schema::{EmotionalState, EventType, LifeDomain};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(id: i64, day: u32) -> LifeEvent {
        let mut e = LifeEvent::new(1, format!("event {id}"), EventType::Daily, date(2026, 6, day));
        e.id = id;
        e
    }

    #[test]
    fn score_is_symmetric() {
        let mut a = event(1, 1);
        a.emotional_state = Some(EmotionalState::Happy);
        a.importance_level = Some(6);
        a.life_domains.insert(LifeDomain::Career);
        let mut b = event(2, 4);
        b.emotional_state = Some(EmotionalState::Happy);
        b.importance_level = Some(7);
        b.life_domains.insert(LifeDomain::Career);

        let (left, _) = score_pair(&a, &b);
        let (right, _) = score_pair(&b, &a);
        assert_eq!(left, right);
        assert!(left > 0.9);
    }

    #[test]
    fn temporal_only_pairs_stay_below_threshold() {
        // 0.3 alone does not clear a strict > 0.3 check.
        let a = event(1, 1);
        let b = event(2, 5);
        let found = ConnectionAnalyzer::default().analyze(&[a, b]);
        assert!(found.is_empty());
    }

    #[test]
    fn emotion_plus_importance_without_proximity_is_excluded() {
        let mut a = event(1, 1);
        a.event_date = date(2026, 1, 1);
        a.emotional_state = Some(EmotionalState::Calm);
        a.importance_level = Some(5);
        let mut b = event(2, 1);
        b.event_date = date(2026, 3, 1);
        b.emotional_state = Some(EmotionalState::Calm);
        b.importance_level = Some(6);

        // 0.2 + 0.1 sums to exactly the threshold.
        let found = ConnectionAnalyzer::default().analyze(&[a, b]);
        assert!(found.is_empty());
    }

    #[test]
    fn domain_overlap_scales_with_intersection_size() {
        let mut a = event(1, 1);
        a.event_date = date(2026, 1, 1);
        a.life_domains.insert(LifeDomain::Career);
        a.life_domains.insert(LifeDomain::Learning);
        let mut b = event(2, 1);
        b.event_date = date(2026, 3, 1);
        b.life_domains.insert(LifeDomain::Career);
        b.life_domains.insert(LifeDomain::Learning);

        let found = ConnectionAnalyzer::default().analyze(&[a, b]);
        assert_eq!(found.len(), 1);
        assert!((found[0].strength - 0.8).abs() < 1e-6);
        assert_eq!(found[0].kinds, vec![ConnectionKind::SharedDomain]);
    }

    #[test]
    fn empty_domains_contribute_nothing() {
        let mut a = event(1, 1);
        a.life_domains.insert(LifeDomain::Career);
        let b = event(2, 2);
        let (strength, kinds) = score_pair(&a, &b);
        // Only temporal proximity remains.
        assert!((strength - 0.3).abs() < 1e-6);
        assert_eq!(kinds, vec![ConnectionKind::TemporalProximity]);
    }

    #[test]
    fn output_is_sorted_capped_and_canonical() {
        let mut events = Vec::new();
        for id in 1..=8 {
            let mut e = event(id, 1);
            e.life_domains.insert(LifeDomain::Health);
            e.emotional_state = Some(EmotionalState::Happy);
            events.push(e);
        }
        // Reversed input order must not matter for the canonical pair.
        events.reverse();

        let found = ConnectionAnalyzer::default().analyze(&events);
        assert_eq!(found.len(), 10);
        for pair in found.windows(2) {
            assert!(pair[0].strength >= pair[1].strength);
        }
        for connection in &found {
            assert!(connection.event_a < connection.event_b);
        }
        // All strengths equal here, so the id pairs break the ties.
        assert_eq!((found[0].event_a, found[0].event_b), (1, 2));
        assert_eq!((found[1].event_a, found[1].event_b), (1, 3));
    }
}
