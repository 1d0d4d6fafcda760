pub mod route_request;
