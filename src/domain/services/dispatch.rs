use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};
use crate::domain::{
    models::{attendee::Attendee, notification::{Notification, NotificationKind}},
    ports::NotificationService,
    services::feed::{AttendanceChanged, AttendanceFeed},
};

/// Side effects of a committed transition: the stats signal and the guest /
/// organizer notification. Neither can fail the transition that caused them.
pub struct Dispatcher {
    notifier: Arc<dyn NotificationService>,
    feed: AttendanceFeed,
    organizer_email: Option<String>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn NotificationService>, feed: AttendanceFeed, organizer_email: Option<String>) -> Self {
        Self { notifier, feed, organizer_email }
    }

    /// Stats signal only, for changes nobody needs to be told about.
    pub fn changed(&self, attendee: &Attendee) {
        self.feed.publish(AttendanceChanged {
            event_id: attendee.event_id.clone(),
            attendee_id: attendee.id.clone(),
            status: attendee.status,
        });
    }

    pub fn committed(&self, attendee: &Attendee, kind: NotificationKind) {
        self.changed(attendee);

        let notification = Notification::for_attendee(attendee, kind, self.organizer_email.as_deref());
        if notification.recipients.is_empty() {
            debug!(attendee_id = %attendee.id, %kind, "No recipients for notification");
            return;
        }

        let notifier = self.notifier.clone();
        let span = info_span!(
            "notification",
            attendee_id = %notification.attendee_id,
            kind = %notification.kind
        );

        tokio::spawn(
            async move {
                match notifier.send(&notification).await {
                    Ok(()) => info!("Notification sent"),
                    Err(e) => error!("Notification failed, transition stays committed: {}", e),
                }
            }
                .instrument(span),
        );
    }
}
