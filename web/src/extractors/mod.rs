pub(crate) mod current_session;
