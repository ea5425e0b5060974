pub mod movement;
pub mod collision;
pub mod production;
pub mod ai;
