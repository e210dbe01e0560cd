use crate::wizard::phase::Phase;

pub(super) fn build_phase_sidebar(current: Phase) -> String {
    Phase::all()
        .iter()
        .map(|phase| {
            let marker = if *phase == current {
                "▶"
            } else if phase.is_before(current) {
                "✓"
            } else {
                " "
            };
            format!("{} {}", marker, phase.title())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_done_current_and_pending() {
        let sidebar = build_phase_sidebar(Phase::Git);
        let lines: Vec<&str> = sidebar.lines().collect();
        assert_eq!(lines[0], "✓ Deployment Target");
        assert_eq!(lines[3], "▶ Git Identity");
        assert_eq!(lines[4], "  Host");
    }
}
