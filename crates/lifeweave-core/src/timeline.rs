//! Read-side analytics over the event timeline, plus event registration
//! with enrichment. Analyses run on a snapshot of the user's events and
//! never touch conversation state.

use std::sync::Arc;

use chrono::NaiveDate;
use lifeweave_schema::{EventConnection, LifeEvent, UserId};
use lifeweave_store::EventStore;
use tracing::debug;

use crate::config::CoreConfig;
use crate::connections::ConnectionAnalyzer;
use crate::enrich;
use crate::error::{CoreError, CoreResult};
use crate::trends::{TrajectoryOverview, TrendPredictor, TrendReport};

pub struct TimelineAnalytics {
    events: Arc<dyn EventStore>,
    analyzer: ConnectionAnalyzer,
    predictor: TrendPredictor,
}

impl TimelineAnalytics {
    pub fn new(events: Arc<dyn EventStore>, config: &CoreConfig) -> Self {
        Self {
            events,
            analyzer: ConnectionAnalyzer::new(config.connection_threshold, config.max_connections),
            predictor: TrendPredictor::new(config.trend_window_days),
        }
    }

    /// Enriches and stores a new event: inferred domains, impact timeframe,
    /// the milestone flag, and cached persona recommendations.
    pub async fn register_event(&self, mut event: LifeEvent) -> CoreResult<LifeEvent> {
        if event.title.trim().is_empty() {
            return Err(CoreError::Validation("event title is empty".into()));
        }
        enrich::enrich(&mut event);
        let stored = self.events.insert_event(event).await?;
        debug!(
            event_id = stored.id,
            user_id = stored.user_id,
            milestone = stored.is_milestone,
            "event registered"
        );
        Ok(stored)
    }

    pub async fn connections_for_user(&self, user_id: UserId) -> CoreResult<Vec<EventConnection>> {
        let events = self.events.events_for_user(user_id).await?;
        Ok(self.analyzer.analyze(&events))
    }

    pub async fn trends_for_user(&self, user_id: UserId, today: NaiveDate) -> CoreResult<TrendReport> {
        let events = self.events.events_for_user(user_id).await?;
        Ok(self.predictor.predict(&events, today))
    }

    pub async fn trajectory_overview(
        &self,
        user_id: UserId,
        today: NaiveDate,
    ) -> CoreResult<TrajectoryOverview> {
        let events = self.events.events_for_user(user_id).await?;
        Ok(self.predictor.trajectory_overview(&events, today))
    }
}
