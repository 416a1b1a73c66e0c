pub mod services {
    pub mod provision;
}

pub mod dtos {
    pub mod validation;
}
