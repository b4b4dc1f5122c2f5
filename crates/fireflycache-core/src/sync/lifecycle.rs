/// Foreground state reported by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    #[default]
    Active,
    Inactive,
    Background,
}

impl AppState {
    /// Coming back to the foreground is the only automatic resync trigger.
    pub fn is_resume(previous: AppState, next: AppState) -> bool {
        matches!(previous, AppState::Inactive | AppState::Background) && next == AppState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_resume() {
        assert!(AppState::is_resume(AppState::Background, AppState::Active));
        assert!(AppState::is_resume(AppState::Inactive, AppState::Active));
        assert!(!AppState::is_resume(AppState::Active, AppState::Active));
        assert!(!AppState::is_resume(AppState::Background, AppState::Inactive));
    }
}
