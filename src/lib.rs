pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub mod security {
    pub mod codec;
    pub mod engine;
    pub mod ledger;
    pub mod registry;
    pub mod store;
    pub mod token;
}

pub mod models {
    pub mod attendance;
    pub mod class;
    pub mod session;
    pub mod user;
}

pub mod repositories {
    pub mod attendance;
    pub mod class;
    pub mod user;
}

pub mod services {
    pub mod attendance;
    pub mod auth;
    pub mod classes;
}

pub mod handlers {
    pub mod attendance;
    pub mod auth;
    pub mod classes;
    pub mod security;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod csrf;
    pub mod rate_limit;
}

pub mod validation {
    pub mod auth;
    pub mod classes;
}
