mod reference;
mod test_utils;

mod components;
mod fused;
