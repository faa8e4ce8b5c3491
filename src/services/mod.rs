pub(crate) mod reconcile;
pub(crate) mod report;
pub(crate) mod xlsx;
