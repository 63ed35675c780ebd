/// Support-ticket transition matrix (spec.md §4.4).
pub fn ticket_transition_allowed(from: &str, to: &str) -> bool {
    let allowed: &[&str] = match from {
        "open" => &["in_progress", "waiting", "resolved", "closed"],
        "in_progress" => &["waiting", "resolved", "closed", "open"],
        "waiting" => &["in_progress", "resolved", "closed"],
        "resolved" => &["closed", "open"],
        "closed" => &["open"],
        _ => &[],
    };
    allowed.contains(&to)
}

/// Card status transition matrix: `active<->blocked`, both can cancel,
/// `cancelled` is terminal.
pub fn card_transition_allowed(from: &str, to: &str) -> bool {
    let allowed: &[&str] = match from {
        "active" => &["blocked", "cancelled"],
        "blocked" => &["active", "cancelled"],
        "cancelled" => &[],
        _ => &[],
    };
    allowed.contains(&to)
}

/// Transfer status transition matrix: only `pending` can move; every
/// other status is terminal.
pub fn transfer_transition_allowed(from: &str, to: &str) -> bool {
    match from {
        "pending" => matches!(to, "completed" | "failed" | "cancelled"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_closed_can_only_reopen() {
        assert!(ticket_transition_allowed("closed", "open"));
        assert!(!ticket_transition_allowed("closed", "resolved"));
    }

    #[test]
    fn card_cancelled_is_terminal() {
        assert!(!card_transition_allowed("cancelled", "active"));
        assert!(card_transition_allowed("blocked", "active"));
    }

    #[test]
    fn transfer_only_pending_can_move() {
        assert!(transfer_transition_allowed("pending", "completed"));
        assert!(!transfer_transition_allowed("completed", "cancelled"));
    }
}
