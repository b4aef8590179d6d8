
mod support;

mod test_throttle_state;
