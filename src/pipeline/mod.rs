pub mod diagnosis;
pub mod evidence;
pub mod narrative;
pub mod prediction;
