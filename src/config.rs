use crate::consts;

#[derive(Copy, Clone, Debug)]
/// Http2 request streams configuration
pub struct Config {
    /// Buffered request body bytes before frame delivery is suspended
    pub(crate) body_buffer_size: usize,
    /// Initial push capability, until peer settings say otherwise
    pub(crate) enable_push: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl Config {
    /// Create configuration
    pub fn new() -> Self {
        Config {
            body_buffer_size: consts::DEFAULT_BODY_BUFFER_SIZE,
            enable_push: false,
        }
    }

    /// Sets the amount of request body data buffered per stream.
    ///
    /// Once a stream's body holds this many unread bytes, delivery of further
    /// DATA frames for that stream waits until the application reads from the
    /// body. Other streams are not affected.
    ///
    /// The default value is 64Kb.
    ///
    /// # Panics
    ///
    /// This function panics if `size` is zero.
    pub fn set_body_buffer_size(mut self, size: usize) -> Self {
        assert!(size > 0, "body buffer size must be positive");
        self.body_buffer_size = size;
        self
    }

    /// Sets initial server push capability.
    ///
    /// Peers advertise `SETTINGS_ENABLE_PUSH`, the connection updates the
    /// capability when the settings arrive. Server push is disabled by
    /// default.
    pub fn set_enable_push(mut self, enable: bool) -> Self {
        self.enable_push = enable;
        self
    }

    /// Body buffer size
    pub fn body_buffer_size(&self) -> usize {
        self.body_buffer_size
    }
}
