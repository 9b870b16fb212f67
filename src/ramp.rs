use super::Float;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VoiceState {
    Idle,
    RampingUp,
    Steady,
    RampingDown,
}

impl VoiceState {
    /// State entered when the running ramp completes.
    fn next(&self) -> VoiceState {
        match self {
            VoiceState::RampingUp => VoiceState::Steady,
            VoiceState::RampingDown => VoiceState::Idle,
            VoiceState::Idle => VoiceState::Idle,
            VoiceState::Steady => VoiceState::Steady,
        }
    }
}

/// Linear amplitude ramp that suppresses clicks on start and stop.
///
/// Both directions take `length` samples regardless of where they start,
/// so a stop during the attack ramps down from the amplitude reached so far.
#[derive(Debug)]
pub struct Ramp {
    target: Float,
    length: u32,

    increment: Float,
    remaining: u32,
    value: Float,
    state: VoiceState,
}

impl Ramp {
    pub fn new(target: Float, length: u32) -> Ramp {
        Ramp{target,
             length,
             increment: 0.0,
             remaining: 0,
             value: 0.0,
             state: VoiceState::Idle,
        }
    }

    pub fn reset(&mut self) {
        self.remaining = 0;
        self.increment = 0.0;
        self.change_state(VoiceState::Idle);
    }

    pub fn start(&mut self) {
        match self.state {
            VoiceState::Idle | VoiceState::RampingDown => self.change_state(VoiceState::RampingUp),
            _ => (), // Already on the way up
        }
    }

    pub fn stop(&mut self) {
        match self.state {
            VoiceState::RampingUp | VoiceState::Steady => self.change_state(VoiceState::RampingDown),
            _ => (),
        }
    }

    /// Amplitude for the current sample, then advances by one sample.
    pub fn next_value(&mut self) -> Float {
        let value = self.value;
        match self.state {
            VoiceState::Idle | VoiceState::Steady => (),
            VoiceState::RampingUp | VoiceState::RampingDown => {
                self.value += self.increment;
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.change_state(self.state.next());
                }
            }
        }
        value
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn amplitude(&self) -> Float {
        self.value
    }

    pub fn target(&self) -> Float {
        self.target
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn is_running(&self) -> bool {
        self.state != VoiceState::Idle
    }

    fn change_state(&mut self, new_state: VoiceState) {
        match new_state {
            VoiceState::Idle => self.value = 0.0,
            VoiceState::Steady => self.value = self.target,
            VoiceState::RampingUp => {
                if self.length == 0 || self.value >= self.target {
                    return self.change_state(VoiceState::Steady);
                }
                self.remaining = self.length;
                self.increment = self.calc_increment(self.target);
            }
            VoiceState::RampingDown => {
                if self.length == 0 || self.value <= 0.0 {
                    return self.change_state(VoiceState::Idle);
                }
                self.remaining = self.length;
                self.increment = self.calc_increment(0.0);
            }
        }
        self.state = new_state;
    }

    fn calc_increment(&self, target: Float) -> Float {
        (target - self.value) / self.length as Float
    }
}

#[cfg(test)]
#[test]
fn test_full_cycle() {
    let mut ramp = Ramp::new(1.0, 4);
    assert_eq!(ramp.next_value(), 0.0);
    ramp.start();
    assert_eq!(ramp.state(), VoiceState::RampingUp);
    let up: Vec<Float> = (0..5).map(|_| ramp.next_value()).collect();
    assert_eq!(up, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    assert_eq!(ramp.state(), VoiceState::Steady);

    ramp.stop();
    assert_eq!(ramp.state(), VoiceState::RampingDown);
    let down: Vec<Float> = (0..5).map(|_| ramp.next_value()).collect();
    assert_eq!(down, vec![1.0, 0.75, 0.5, 0.25, 0.0]);
    assert_eq!(ramp.state(), VoiceState::Idle);
}

#[test]
fn test_stop_reverses_from_current_value() {
    let mut ramp = Ramp::new(1.0, 10);
    ramp.start();
    for _ in 0..3 {
        ramp.next_value();
    }
    assert!((ramp.amplitude() - 0.3).abs() < 1e-12);
    ramp.stop();
    assert_eq!(ramp.state(), VoiceState::RampingDown);
    assert!((ramp.next_value() - 0.3).abs() < 1e-12);
    for _ in 0..9 {
        ramp.next_value();
    }
    assert_eq!(ramp.state(), VoiceState::Idle);
    assert_eq!(ramp.amplitude(), 0.0);
}

#[test]
fn test_start_while_ramping_down() {
    let mut ramp = Ramp::new(0.5, 2);
    ramp.start();
    ramp.next_value();
    ramp.next_value();
    assert_eq!(ramp.state(), VoiceState::Steady);
    ramp.stop();
    ramp.next_value();
    ramp.start();
    assert_eq!(ramp.state(), VoiceState::RampingUp);
    assert_eq!(ramp.next_value(), 0.25);
    ramp.next_value();
    assert_eq!(ramp.state(), VoiceState::Steady);
    assert_eq!(ramp.amplitude(), 0.5);
}

#[test]
fn test_redundant_transitions_are_ignored() {
    let mut ramp = Ramp::new(1.0, 4);
    ramp.stop();
    assert_eq!(ramp.state(), VoiceState::Idle);
    ramp.start();
    ramp.next_value();
    ramp.start();
    assert_eq!(ramp.next_value(), 0.25); // Not restarted
}

#[test]
fn test_zero_length_steps() {
    let mut ramp = Ramp::new(0.8, 0);
    ramp.start();
    assert_eq!(ramp.state(), VoiceState::Steady);
    assert_eq!(ramp.next_value(), 0.8);
    ramp.stop();
    assert_eq!(ramp.state(), VoiceState::Idle);
    assert_eq!(ramp.next_value(), 0.0);
}
