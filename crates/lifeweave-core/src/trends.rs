//! Read-side analytics over a snapshot of a user's timeline: the windowed
//! emotional trend and an overall trajectory overview.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate};
use lifeweave_schema::{EventType, LifeDomain, LifeEvent};
use serde::{Deserialize, Serialize};

/// Average intensity with no data points. Midpoint of the 1-10 scale.
const NEUTRAL_INTENSITY: f32 = 5.0;
const RECENT_SAMPLE: usize = 5;
const RECENT_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthArea {
    pub domain: LifeDomain,
    pub insight: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub average_intensity: f32,
    pub trend: EmotionalTrend,
    pub growth_areas: Vec<GrowthArea>,
    pub challenges: Vec<String>,
    pub opportunities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryOverview {
    pub total_events: usize,
    pub milestone_count: usize,
    pub recent_event_count: usize,
    pub domain_distribution: BTreeMap<LifeDomain, usize>,
    pub trend: EmotionalTrend,
    pub insights: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TrendPredictor {
    window_days: i64,
}

impl TrendPredictor {
    pub fn new(window_days: i64) -> Self {
        Self { window_days }
    }

    /// Forecast over events whose date falls inside the window ending at
    /// `today`. The snapshot is read-only; the caller decides when to
    /// refresh it.
    pub fn predict(&self, events: &[LifeEvent], today: NaiveDate) -> TrendReport {
        let windowed = self.window(events, today);

        TrendReport {
            average_intensity: average_intensity(&windowed),
            trend: emotional_trend(&windowed),
            growth_areas: growth_areas(&windowed),
            challenges: challenges(&windowed),
            opportunities: opportunities(&windowed),
        }
    }

    /// Whole-timeline summary; only the trend component is windowed.
    pub fn trajectory_overview(&self, events: &[LifeEvent], today: NaiveDate) -> TrajectoryOverview {
        let windowed = self.window(events, today);
        let recent_cutoff = today - Duration::days(RECENT_DAYS);

        let mut domain_distribution: BTreeMap<LifeDomain, usize> = BTreeMap::new();
        for event in events {
            for domain in &event.life_domains {
                *domain_distribution.entry(*domain).or_default() += 1;
            }
        }

        TrajectoryOverview {
            total_events: events.len(),
            milestone_count: events.iter().filter(|e| e.is_milestone).count(),
            recent_event_count: events
                .iter()
                .filter(|e| e.event_date >= recent_cutoff)
                .count(),
            domain_distribution,
            trend: emotional_trend(&windowed),
            insights: trajectory_insights(events),
        }
    }

    fn window<'a>(&self, events: &'a [LifeEvent], today: NaiveDate) -> Vec<&'a LifeEvent> {
        let cutoff = today - Duration::days(self.window_days);
        let mut windowed: Vec<&LifeEvent> = events
            .iter()
            .filter(|e| e.event_date >= cutoff && e.event_date <= today)
            .collect();
        windowed.sort_by_key(|e| (e.event_date, e.id));
        windowed
    }
}

impl Default for TrendPredictor {
    fn default() -> Self {
        Self::new(90)
    }
}

fn average_intensity(windowed: &[&LifeEvent]) -> f32 {
    let intensities: Vec<f32> = windowed
        .iter()
        .filter_map(|e| e.emotional_intensity)
        .map(f32::from)
        .collect();
    if intensities.is_empty() {
        return NEUTRAL_INTENSITY;
    }
    intensities.iter().sum::<f32>() / intensities.len() as f32
}

/// Recent-versus-window comparison. Needs at least 3 events carrying an
/// intensity; anything thinner is reported stable.
fn emotional_trend(windowed: &[&LifeEvent]) -> EmotionalTrend {
    let scored: Vec<f32> = windowed
        .iter()
        .filter_map(|e| e.emotional_intensity)
        .map(f32::from)
        .collect();
    if scored.len() < 3 {
        return EmotionalTrend::Stable;
    }

    let window_avg = scored.iter().sum::<f32>() / scored.len() as f32;
    let recent = &scored[scored.len().saturating_sub(RECENT_SAMPLE)..];
    let recent_avg = recent.iter().sum::<f32>() / recent.len() as f32;

    if recent_avg > window_avg + 1.0 {
        EmotionalTrend::Improving
    } else if recent_avg < window_avg - 1.0 {
        EmotionalTrend::Declining
    } else {
        EmotionalTrend::Stable
    }
}

fn growth_areas(windowed: &[&LifeEvent]) -> Vec<GrowthArea> {
    let mut counts: BTreeMap<LifeDomain, usize> = BTreeMap::new();
    for event in windowed {
        for domain in &event.life_domains {
            *counts.entry(*domain).or_default() += 1;
        }
    }

    let mut ranked: Vec<(LifeDomain, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(3)
        .map(|(domain, _)| GrowthArea {
            insight: domain_insight(domain).to_string(),
            domain,
        })
        .collect()
}

fn domain_insight(domain: LifeDomain) -> &'static str {
    match domain {
        LifeDomain::Career => "Your professional life is in motion; keep steering it deliberately.",
        LifeDomain::Health => "You are paying attention to your health; the routine is compounding.",
        LifeDomain::Relationship => "Your relationships are an active part of your story right now.",
        LifeDomain::Learning => "You are in a learning phase; new skills are accumulating.",
        LifeDomain::Finance => "Financial matters have your attention; small decisions add up.",
        LifeDomain::PersonalGrowth => "You are investing in yourself; the inner work is showing.",
    }
}

fn challenges(windowed: &[&LifeEvent]) -> Vec<String> {
    let total = windowed.len();
    if total == 0 {
        return Vec::new();
    }

    let mut flags = Vec::new();
    let challenge_count = windowed
        .iter()
        .filter(|e| e.event_type == EventType::Challenge)
        .count();
    if challenge_count as f32 > total as f32 * 0.3 {
        flags.push("A large share of recent events were challenges; consider what support you need.".to_string());
    }

    let negative_count = windowed
        .iter()
        .filter(|e| e.emotional_state.is_some_and(|s| s.is_negative()))
        .count();
    if negative_count as f32 > total as f32 * 0.2 {
        flags.push("Difficult emotions have come up often lately; it may help to talk them through.".to_string());
    }
    flags
}

fn opportunities(windowed: &[&LifeEvent]) -> Vec<String> {
    let mut flags = Vec::new();
    if windowed.iter().any(|e| e.event_type == EventType::Learning) {
        flags.push("Recent learning is an opening; build on it while the momentum is there.".to_string());
    }
    if windowed.iter().any(|e| e.event_type == EventType::Achievement) {
        flags.push("Recent wins are worth leveraging; let them open the next door.".to_string());
    }
    flags
}

fn trajectory_insights(events: &[LifeEvent]) -> Vec<String> {
    let total = events.len();
    if total == 0 {
        return Vec::new();
    }
    let share = |count: usize| count as f32 / total as f32;

    let mut insights = Vec::new();
    let learning = events.iter().filter(|e| e.event_type == EventType::Learning).count();
    if share(learning) > 0.3 {
        insights.push("Learning dominates your timeline; you are in a strong growth period.".to_string());
    }
    let achievements = events
        .iter()
        .filter(|e| e.event_type == EventType::Achievement)
        .count();
    if share(achievements) > 0.2 {
        insights.push("You record achievements often; your efforts are visibly paying off.".to_string());
    }
    let challenges = events
        .iter()
        .filter(|e| e.event_type == EventType::Challenge)
        .count();
    if share(challenges) > 0.3 {
        insights.push("Challenges are a recurring theme; resilience is becoming one of your strengths.".to_string());
    }

    let months: BTreeSet<(i32, u32)> = events
        .iter()
        .map(|e| (e.event_date.year(), e.event_date.month()))
        .collect();
    if months.len() > 3 {
        insights.push("You have kept this journal going across many months; the record itself is an asset.".to_string());
    }

    let milestones = events.iter().filter(|e| e.is_milestone).count();
    if milestones > 0 {
        insights.push(format!(
            "You have marked {milestones} milestone moment{} so far.",
            if milestones == 1 { "" } else { "s" }
        ));
    }
    insights
}
