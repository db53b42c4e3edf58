pub(crate) mod assignments;
pub(crate) mod health;
pub(crate) mod problems;
pub(crate) mod submissions;
pub(crate) mod test_cases;
pub(crate) mod users;
