use tera::{Context, Tera};
use crate::domain::models::notification::{Notification, NotificationKind};
use crate::error::AppError;

const KINDS: [NotificationKind; 4] = [
    NotificationKind::AttendanceConfirmed,
    NotificationKind::CheckedIn,
    NotificationKind::CheckInReverted,
    NotificationKind::MarkedAbsent,
];

fn default_body(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::AttendanceConfirmed => include_str!("../../../templates/notifications/attendance_confirmed.html"),
        NotificationKind::CheckedIn => include_str!("../../../templates/notifications/checked_in.html"),
        NotificationKind::CheckInReverted => include_str!("../../../templates/notifications/check_in_reverted.html"),
        NotificationKind::MarkedAbsent => include_str!("../../../templates/notifications/marked_absent.html"),
    }
}

pub fn default_subject(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::AttendanceConfirmed => "Attendance confirmed: your entry code",
        NotificationKind::CheckedIn => "You're checked in",
        NotificationKind::CheckInReverted => "Your check-in was reverted",
        NotificationKind::MarkedAbsent => "Marked as absent",
    }
}

pub fn template_name(kind: NotificationKind) -> String {
    format!("{}.html", kind)
}

/// One Tera instance with every built-in body registered under `<kind>.html`.
pub fn load() -> Result<Tera, AppError> {
    let mut tera = Tera::default();
    for kind in KINDS {
        tera.add_raw_template(&template_name(kind), default_body(kind))
            .map_err(|e| AppError::InternalWithMsg(format!("Invalid {} template: {}", kind, e)))?;
    }
    Ok(tera)
}

pub fn render(tera: &Tera, notification: &Notification) -> Result<String, AppError> {
    let context = Context::from_value(notification.context.clone())
        .map_err(|e| AppError::InternalWithMsg(format!("Notification context: {}", e)))?;

    tera.render(&template_name(notification.kind), &context)
        .map_err(|e| AppError::InternalWithMsg(format!("Rendering {} failed: {}", notification.kind, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::attendee::{Attendee, Identity};
    use chrono::Utc;

    fn guest() -> Attendee {
        Attendee::pending(
            "ev".into(),
            Identity::Guest { name: "Ana".into(), email: "ana@example.com".into(), whatsapp: None },
            Utc::now(),
        )
    }

    #[test]
    fn test_every_kind_has_a_template() {
        let tera = load().unwrap();
        for kind in KINDS {
            assert!(tera.get_template_names().any(|name| name == template_name(kind)), "missing {kind}");
        }
    }

    #[test]
    fn test_confirmation_carries_code() {
        let tera = load().unwrap();
        let mut attendee = guest();
        attendee.qr_code = Some("GAL-EV-ANA-ABCDEFGH23456789".into());
        attendee.companions_count = 2;

        let html = render(&tera, &Notification::for_attendee(&attendee, NotificationKind::AttendanceConfirmed, None)).unwrap();

        assert!(html.contains("Hi Ana"));
        assert!(html.contains("GAL-EV-ANA-ABCDEFGH23456789"));
        assert!(html.contains("2 companions"));
    }

    #[test]
    fn test_templates_render_without_code() {
        let tera = load().unwrap();
        for kind in KINDS {
            let html = render(&tera, &Notification::for_attendee(&guest(), kind, None)).unwrap();
            assert!(html.contains("Ana"), "{kind} did not render the guest name");
        }
    }
}
