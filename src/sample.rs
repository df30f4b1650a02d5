use std::fmt;

/// One reading of the solar charge controller, in physical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Battery voltage in V
    pub battery_voltage: f32,
    /// Battery charge current in A
    pub battery_current: f32,
    /// Battery charge power in W
    pub battery_power: u16,
    /// Controller temperature in ºC
    pub controller_temperature: f32,
    /// Load output voltage in V
    pub load_voltage: f32,
    /// Load output current in A
    pub load_current: f32,
    /// Load output power in W
    pub load_power: f32,
    /// Solar panel input voltage in V
    pub panel_voltage: f32,
    /// Highest charge power seen today in W
    pub max_charge_power: u16,
    /// Energy charged today in Wh
    pub energy_today: u16,
    /// Days the controller has been running
    pub running_days: u16,
    /// Lifetime energy charged in Wh
    pub total_energy: u16,
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sample {{ battery_voltage: {:.1}V, battery_current: {:.2}A, battery_power: {}W, \
             controller_temperature: {:.1}ºC, load_voltage: {:.1}V, load_current: {:.2}A, \
             load_power: {:.1}W, panel_voltage: {:.1}V, max_charge_power: {}W, \
             energy_today: {}Wh, running_days: {}d, total_energy: {}Wh }}",
            self.battery_voltage,
            self.battery_current,
            self.battery_power,
            self.controller_temperature,
            self.load_voltage,
            self.load_current,
            self.load_power,
            self.panel_voltage,
            self.max_charge_power,
            self.energy_today,
            self.running_days,
            self.total_energy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sample {
        Sample {
            battery_voltage: 13.6,
            battery_current: 4.25,
            battery_power: 57,
            controller_temperature: 31.0,
            load_voltage: 13.5,
            load_current: 0.5,
            load_power: 6.8,
            panel_voltage: 18.2,
            max_charge_power: 120,
            energy_today: 340,
            running_days: 12,
            total_energy: 9876,
        }
    }

    #[test]
    fn test_display_fixed_precision_and_units() {
        assert_eq!(
            sample().to_string(),
            "Sample { battery_voltage: 13.6V, battery_current: 4.25A, battery_power: 57W, \
             controller_temperature: 31.0ºC, load_voltage: 13.5V, load_current: 0.50A, \
             load_power: 6.8W, panel_voltage: 18.2V, max_charge_power: 120W, \
             energy_today: 340Wh, running_days: 12d, total_energy: 9876Wh }"
        );
    }

    #[test]
    fn test_display_does_not_round_stored_values() {
        let mut s = sample();
        s.battery_current = 1.234;
        assert!(s.to_string().contains("battery_current: 1.23A"));
        assert_eq!(s.battery_current, 1.234);
    }

    #[test]
    fn test_display_is_deterministic() {
        assert_eq!(sample().to_string(), sample().to_string());
    }
}
