/// Pull interface between a sound source and the audio output.
pub trait SampleGenerator {
    /// Fills `out` with the next `out.len()` mono samples in [-1, 1].
    ///
    /// Runs on the audio thread: must not block, allocate or fail. A source
    /// that cannot produce valid samples writes silence instead.
    fn produce_block(&mut self, out: &mut [f32]);

    fn sample_rate(&self) -> u32;
}
