pub mod ask;
pub mod doctor;
pub mod personas;
pub mod serve;
