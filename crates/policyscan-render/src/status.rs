use policyscan_types::{NotificationKind, StatusResult, StatusSnapshot, StatusState};

/// One-screen terminal rendering of a status snapshot.
pub fn render_status(snapshot: &StatusSnapshot) -> String {
    let mut out = String::new();

    let state = match &snapshot.state {
        StatusState::Pending { .. } => "PENDING",
        StatusState::Completed {
            result: StatusResult::Success,
            ..
        } => "SUCCESS",
        StatusState::Completed {
            result: StatusResult::Failure,
            ..
        } => "FAILURE",
    };
    out.push_str(&format!(
        "{}: {} - {}\n",
        snapshot.title,
        state,
        snapshot.state.message()
    ));

    for n in &snapshot.notifications {
        let marker = match n.kind {
            NotificationKind::Error => "x",
            NotificationKind::Warning => "!",
        };
        out.push_str(&format!("  {} {}\n", marker, n.title));
    }

    out
}
