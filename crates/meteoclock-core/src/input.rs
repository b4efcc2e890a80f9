/// Analog push button sampled by level.
pub trait ButtonInput {
    /// Raw ADC reading; higher means pressed.
    fn sample(&mut self) -> u16;
}

impl<T: ButtonInput + ?Sized> ButtonInput for &mut T {
    fn sample(&mut self) -> u16 {
        (**self).sample()
    }
}
