mod test_service;
pub(crate) mod utils;
