pub(crate) mod auth;
pub(crate) mod errors;
pub(crate) mod export;
pub(crate) mod grades;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod router;
pub(crate) mod students;
pub(crate) mod subjects;
pub(crate) mod tasks;
