//! Push Dispatcher - batch fan-out over device tokens
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::apns::PushGateway;
use crate::error::RelayError;
use crate::notification::{Notification, NotificationKind};
use crate::retry::{deliver, DeliveryOutcome};
use crate::schemas::PushRequest;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::info;

/// Per-batch delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Accepted on the first attempt
    pub delivered: usize,
    /// Accepted on a retry
    pub retried: usize,
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.delivered += 1,
            DeliveryOutcome::RetriedThenDelivered { .. } => self.retried += 1,
            DeliveryOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.delivered + self.retried + self.failed
    }
}

/// Dispatcher that delivers one notification per device token
pub struct PushDispatcher {
    gateway: Arc<dyn PushGateway>,
    topic: String,
    max_concurrency: usize,
}

impl PushDispatcher {
    /// Create a new push dispatcher
    pub fn new(
        gateway: Arc<dyn PushGateway>,
        topic: impl Into<String>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            gateway,
            topic: topic.into(),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Build the notifications for a request without sending them
    pub fn build_notifications(
        &self,
        request: &PushRequest,
    ) -> Result<Vec<Notification>, RelayError> {
        let tokens = match request.tokens.as_deref() {
            Some(tokens) if !tokens.is_empty() => tokens,
            _ => return Err(RelayError::MissingTokens),
        };

        let kind =
            NotificationKind::from_request(request.kind.as_deref(), request.payload.as_ref());

        Ok(tokens
            .iter()
            .map(|token| Notification::new(token.clone(), self.topic.clone(), kind.clone()))
            .collect())
    }

    /// Deliver every notification in the request and wait for all of them to settle.
    ///
    /// Individual delivery failures never fail the batch; they are counted in the report.
    pub async fn dispatch(&self, request: &PushRequest) -> Result<BatchReport, RelayError> {
        let notifications = self.build_notifications(request)?;

        info!(
            tokens = notifications.len(),
            background = notifications.first().is_some_and(|n| n.kind.is_background()),
            max_concurrency = self.max_concurrency,
            "Dispatching push batch"
        );

        let gateway = Arc::clone(&self.gateway);
        let outcomes: Vec<DeliveryOutcome> = stream::iter(notifications)
            .map(move |notification| {
                let gateway = Arc::clone(&gateway);
                async move { deliver(gateway.as_ref(), &notification).await }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for outcome in &outcomes {
            report.record(outcome);
        }

        info!(
            delivered = report.delivered,
            retried = report.retried,
            failed = report.failed,
            "Push batch settled"
        );

        Ok(report)
    }
}
