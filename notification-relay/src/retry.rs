//! Delivery retry for push notifications
//!
//! A delivery gets one immediate retry when the first attempt fails with a
//! transient socket-level error. There is no backoff. Terminal failures are
//! logged and returned as [`DeliveryOutcome::Failed`]; nothing here returns
//! an `Err`.
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


use crate::apns::{is_transient_error, PushError, PushGateway};
use crate::notification::Notification;
use tracing::{debug, error, warn};

/// Retries allowed after the first attempt
pub const DEFAULT_RETRY_BUDGET: u32 = 1;

/// Result of delivering one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Accepted on the first attempt
    Delivered,
    /// Accepted after at least one transient failure
    RetriedThenDelivered { attempts: u32 },
    /// Gave up; the error is from the last attempt
    Failed { attempts: u32, error: PushError },
}

impl DeliveryOutcome {
    /// Total attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Delivered => 1,
            DeliveryOutcome::RetriedThenDelivered { attempts }
            | DeliveryOutcome::Failed { attempts, .. } => *attempts,
        }
    }

    pub fn is_delivered(&self) -> bool {
        !matches!(self, DeliveryOutcome::Failed { .. })
    }
}

/// Deliver a notification with the default retry budget
pub async fn deliver(gateway: &dyn PushGateway, notification: &Notification) -> DeliveryOutcome {
    deliver_with_budget(gateway, notification, DEFAULT_RETRY_BUDGET).await
}

/// Deliver a notification, retrying transient failures while budget remains
pub async fn deliver_with_budget(
    gateway: &dyn PushGateway,
    notification: &Notification,
    mut attempts_remaining: u32,
) -> DeliveryOutcome {
    let mut attempts = 0;

    loop {
        attempts += 1;

        match gateway.send(notification).await {
            Ok(()) if attempts == 1 => return DeliveryOutcome::Delivered,
            Ok(()) => {
                debug!(
                    device_token = %notification.device_token,
                    attempts = attempts,
                    "Notification delivered after retry"
                );
                return DeliveryOutcome::RetriedThenDelivered { attempts };
            }
            Err(e) => {
                if attempts_remaining > 0 && is_transient_error(&e) {
                    attempts_remaining -= 1;
                    warn!(
                        device_token = %notification.device_token,
                        attempt = attempts,
                        error = %e,
                        "Transient delivery failure, retrying"
                    );
                    continue;
                }

                error!(
                    device_token = %notification.device_token,
                    attempts = attempts,
                    error = %e,
                    "Notification delivery failed"
                );
                return DeliveryOutcome::Failed { attempts, error: e };
            }
        }
    }
}
