pub(crate) mod route_guard;
