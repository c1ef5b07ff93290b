mod act_fn;
mod pred_act_fn;
mod sigmoid;

pub use act_fn::ActFn;
pub use pred_act_fn::PredActFn;
pub use sigmoid::Sigmoid;
