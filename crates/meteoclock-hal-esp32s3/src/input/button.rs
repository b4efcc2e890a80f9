use esp_hal::{
    Blocking,
    analog::adc::{Adc, AdcChannel, AdcPin},
    peripherals::ADC1,
};
use log::warn;
use meteoclock_core::input::ButtonInput;

/// Push button wired as a divider into an ADC1 channel.
pub struct AnalogButton<'d, PIN> {
    adc: Adc<'d, ADC1<'d>, Blocking>,
    pin: AdcPin<PIN, ADC1<'d>>,
    fault_logged: bool,
}

impl<'d, PIN> AnalogButton<'d, PIN>
where
    PIN: AdcChannel,
{
    pub fn new(adc: Adc<'d, ADC1<'d>, Blocking>, pin: AdcPin<PIN, ADC1<'d>>) -> Self {
        Self {
            adc,
            pin,
            fault_logged: false,
        }
    }
}

impl<PIN> ButtonInput for AnalogButton<'_, PIN>
where
    PIN: AdcChannel,
{
    fn sample(&mut self) -> u16 {
        match nb::block!(self.adc.read_oneshot(&mut self.pin)) {
            Ok(level) => level,
            Err(()) => {
                if !self.fault_logged {
                    self.fault_logged = true;
                    warn!("button: adc conversion failed");
                }
                0
            }
        }
    }
}
