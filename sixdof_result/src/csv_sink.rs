use std::{
    collections::HashMap,
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use csv::Writer;
use tracing::debug;

use crate::{INERTIAL_STATE_OUTPUT, MessageSink, ResultErrors, StateMessage};

pub type ResultWriter = Writer<BufWriter<File>>;

/// Writes one csv file per message name into a results folder.
pub struct CsvSink {
    result_path: PathBuf,
    state_writer: Option<ResultWriter>,
    observable_writers: HashMap<String, (usize, ResultWriter)>,
}

impl CsvSink {
    pub fn new(result_path: &Path) -> Result<Self, ResultErrors> {
        std::fs::create_dir_all(result_path)?;
        Ok(Self {
            result_path: result_path.to_path_buf(),
            state_writer: None,
            observable_writers: HashMap::new(),
        })
    }

    pub fn result_path(&self) -> &Path {
        &self.result_path
    }

    fn new_writer(&self, name: &str, headers: &[String]) -> Result<ResultWriter, ResultErrors> {
        let filename = name.to_string() + ".csv";
        let path = self.result_path.join(filename);
        debug!("creating result file {}", path.display());
        let file = File::create(path)?;
        let mut writer = Writer::from_writer(BufWriter::new(file));
        writer.write_record(headers)?;
        Ok(writer)
    }
}

impl MessageSink for CsvSink {
    fn publish_state(&mut self, message: &StateMessage) -> Result<(), ResultErrors> {
        if self.state_writer.is_none() {
            let headers: Vec<String> = StateMessage::HEADERS.iter().map(|h| h.to_string()).collect();
            self.state_writer = Some(self.new_writer(INERTIAL_STATE_OUTPUT, &headers)?);
        }
        if let Some(writer) = self.state_writer.as_mut() {
            writer.write_record(message.record())?;
        }
        Ok(())
    }

    fn record_observable(
        &mut self,
        time_ns: u64,
        name: &str,
        values: &[f64],
    ) -> Result<(), ResultErrors> {
        if !self.observable_writers.contains_key(name) {
            let mut headers = vec!["t[s]".to_string()];
            if values.len() == 1 {
                headers.push(name.to_string());
            } else {
                headers.extend((0..values.len()).map(|i| format!("{name}[{i}]")));
            }
            let writer = self.new_writer(name, &headers)?;
            self.observable_writers
                .insert(name.to_string(), (values.len(), writer));
        }
        if let Some((n, writer)) = self.observable_writers.get_mut(name) {
            if *n != values.len() {
                return Err(ResultErrors::ObservableLength {
                    name: name.to_string(),
                    expected: *n,
                    found: values.len(),
                });
            }
            let mut row = Vec::with_capacity(values.len() + 1);
            row.push((time_ns as f64 / 1e9).to_string());
            row.extend(values.iter().map(|v| v.to_string()));
            writer.write_record(&row)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ResultErrors> {
        if let Some(writer) = self.state_writer.as_mut() {
            writer.flush()?;
        }
        for (_, writer) in self.observable_writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
