/// Module for LSTM network models.
pub mod lstm_network;

/// Module for the window-to-temperature model.
pub mod forecaster;
