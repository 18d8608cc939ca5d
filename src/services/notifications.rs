use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::database::PaymentStatus;

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    BookingConfirmed {
        booking_id: i64,
        court_id: i64,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        total_price: Decimal,
    },
    BookingCancelled {
        booking_id: i64,
        reason: String,
        refunded: Option<Decimal>,
    },
    RainCheck {
        booking_id: i64,
        credited: Decimal,
    },
    PaymentStatusChanged {
        booking_id: i64,
        status: PaymentStatus,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::BookingConfirmed { .. } => "booking_confirmed",
            Notification::BookingCancelled { .. } => "booking_cancelled",
            Notification::RainCheck { .. } => "rain_check",
            Notification::PaymentStatusChanged { .. } => "payment_status_changed",
        }
    }
}

/// Per-user publish/subscribe channels.
///
/// Channels are created when a session subscribes and dropped once the last
/// receiver goes away.
#[derive(Clone, Default)]
pub struct NotificationHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Notification>>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, user_id: &str) -> broadcast::Receiver<Notification> {
        let mut channels = self.lock();
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Returns how many live sessions received the notification.
    pub fn publish(&self, user_id: &str, notification: Notification) -> usize {
        let mut channels = self.lock();
        let Some(sender) = channels.get(user_id) else {
            debug!("No subscribers for {}, dropping notification", user_id);
            return 0;
        };

        match sender.send(notification) {
            Ok(delivered) => delivered,
            Err(_) => {
                channels.remove(user_id);
                0
            }
        }
    }

    /// Publishes on a separate task once the caller's transaction has committed.
    pub fn dispatch(&self, user_id: String, notification: Notification) {
        let hub = self.clone();
        tokio::spawn(async move {
            hub.publish(&user_id, notification);
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, broadcast::Sender<Notification>>> {
        match self.channels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Notification hub lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
