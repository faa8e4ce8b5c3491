pub(crate) mod classes;
pub(crate) mod grades;
pub(crate) mod students;
pub(crate) mod subjects;
pub(crate) mod tasks;
pub(crate) mod users;
