//! Notification Relay Library
//!
//! This library provides the relay's notification functionality:
//! - Bearer-token authorization gate
//! - Push notifications (APNS) with a single transient-error retry
//! - Templated transactional email (SMTP)
//! - HTTP surface (axum)
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


pub mod apns;
pub mod auth;
pub mod email;
pub mod error;
pub mod notification;
pub mod push;
pub mod retry;
pub mod schemas;
pub mod sender;
pub mod server;

/// Service name used in logs and health responses
pub const SERVICE_NAME: &str = "notification-relay";
