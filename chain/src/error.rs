use failure::Fail;

#[derive(Debug, Fail)]
pub enum ChainError {
    #[fail(display = "difficulty window config invalid: window={}, cut={}, lag={}", _0, _1, _2)]
    InvalidWindowConfig(usize, usize, usize),
}
