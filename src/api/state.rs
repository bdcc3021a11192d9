use crate::scheduler::SnapshotView;

#[derive(Clone)]
pub struct AppState {
    pub view: SnapshotView,
}
