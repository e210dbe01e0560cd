/// Steps of the wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Target,
    TargetOptions,
    Ssh,
    Git,
    Host,
    Packages,
    Optional,
    Review,
    Deploy,
    Complete,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Target,
            Phase::TargetOptions,
            Phase::Ssh,
            Phase::Git,
            Phase::Host,
            Phase::Packages,
            Phase::Optional,
            Phase::Review,
            Phase::Deploy,
            Phase::Complete,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Phase::Target => "Deployment Target",
            Phase::TargetOptions => "Target Options",
            Phase::Ssh => "SSH Keys",
            Phase::Git => "Git Identity",
            Phase::Host => "Host",
            Phase::Packages => "Packages",
            Phase::Optional => "Optional Secrets",
            Phase::Review => "Review",
            Phase::Deploy => "Deploying",
            Phase::Complete => "Complete",
        }
    }

    /// Forward transition. TargetOptions is one phase whatever sub-form
    /// the chosen target shows.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Target => Some(Phase::TargetOptions),
            Phase::TargetOptions => Some(Phase::Ssh),
            Phase::Ssh => Some(Phase::Git),
            Phase::Git => Some(Phase::Host),
            Phase::Host => Some(Phase::Packages),
            Phase::Packages => Some(Phase::Optional),
            Phase::Optional => Some(Phase::Review),
            Phase::Review => Some(Phase::Deploy),
            Phase::Deploy => Some(Phase::Complete),
            Phase::Complete => None,
        }
    }

    pub fn prev(&self) -> Option<Phase> {
        match self {
            Phase::Target => None,
            Phase::TargetOptions => Some(Phase::Target),
            Phase::Ssh => Some(Phase::TargetOptions),
            Phase::Git => Some(Phase::Ssh),
            Phase::Host => Some(Phase::Git),
            Phase::Packages => Some(Phase::Host),
            Phase::Optional => Some(Phase::Packages),
            Phase::Review => Some(Phase::Optional),
            Phase::Deploy => Some(Phase::Review),
            Phase::Complete => Some(Phase::Deploy),
        }
    }

    /// Target, Deploy and Complete are walls.
    pub fn can_go_back(&self) -> bool {
        !matches!(self, Phase::Target | Phase::Deploy | Phase::Complete)
    }

    /// 1-based position for "step N of M" displays.
    pub fn number(&self) -> usize {
        Phase::all()
            .iter()
            .position(|p| p == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    pub fn is_before(&self, other: Phase) -> bool {
        self.number() < other.number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_prev_round_trip() {
        for phase in Phase::all() {
            if let Some(next) = phase.next() {
                assert_eq!(next.prev(), Some(*phase));
                assert_eq!(next.prev().and_then(|p| p.next()), Some(next));
            }
        }
    }

    #[test]
    fn walls_are_exactly_target_deploy_complete() {
        let walls: Vec<Phase> = Phase::all()
            .iter()
            .copied()
            .filter(|p| !p.can_go_back())
            .collect();
        assert_eq!(walls, vec![Phase::Target, Phase::Deploy, Phase::Complete]);
    }

    #[test]
    fn numbering_follows_order() {
        assert_eq!(Phase::Target.number(), 1);
        assert_eq!(Phase::Complete.number(), 10);
        assert!(Phase::Git.is_before(Phase::Host));
    }
}
