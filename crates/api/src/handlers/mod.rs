pub mod class_rollout;
