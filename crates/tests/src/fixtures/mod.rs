pub mod test_session;
