use crate::{cli::Format, error::CliResult, output};
use rustyline::{Config, Editor, error::ReadlineError, history::DefaultHistory};
use sieve::Engine;

const HELP: &str = "\
Enter query text to compile it against the current entity.

  :entity NAME   switch the root entity
  :describe      show the current entity's metadata
  :parse TEXT    print TEXT in canonical form
  :encode TEXT   print TEXT as flat fields
  :stats         show metadata cache counters
  :help          show this help
  :quit          leave the shell";

///
/// Shell
///

pub struct Shell<'a> {
    engine: &'a Engine,
    entity: String,
    format: Format,
}

impl<'a> Shell<'a> {
    pub const fn new(engine: &'a Engine, entity: String, format: Format) -> Self {
        Self {
            engine,
            entity,
            format,
        }
    }

    pub fn run(mut self) -> CliResult<()> {
        let config = Config::builder().auto_add_history(true).build();
        let mut editor: Editor<(), DefaultHistory> = Editor::with_config(config)?;

        println!("sieve {} shell; :help for commands", sieve::VERSION);
        loop {
            let prompt = format!("{}> ", self.entity);
            match editor.readline(&prompt) {
                Ok(line) => {
                    if !self.handle(line.trim()) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {}
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }

    // false ends the session
    fn handle(&mut self, line: &str) -> bool {
        if line.is_empty() {
            return true;
        }

        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(command, rest)| (command, rest.trim()));
        let result = match command {
            ":quit" | ":q" | ":exit" => return false,
            ":help" | ":h" => Ok(HELP.to_string()),
            ":entity" => self.switch(rest),
            ":describe" => self.describe(),
            ":parse" => self
                .engine
                .parse(rest)
                .map_err(Into::into)
                .and_then(|query| output::query(&query, self.format)),
            ":encode" => self
                .engine
                .parse(rest)
                .and_then(|query| self.engine.encode(&query))
                .map_err(Into::into)
                .and_then(|map| output::flat(&map, self.format)),
            ":stats" => {
                let stats = self.engine.models().stats();
                Ok(format!(
                    "hits {}, misses {}, cached {}",
                    stats.hits, stats.misses, stats.size
                ))
            }
            _ if command.starts_with(':') => Ok(format!("unknown command {command}; try :help")),
            _ => self
                .engine
                .compile_text(&self.entity, line)
                .map_err(Into::into)
                .and_then(|compiled| output::compiled(&compiled, self.format)),
        };

        match result {
            Ok(text) => println!("{text}"),
            Err(err) => eprintln!("error: {err}"),
        }

        true
    }

    fn switch(&mut self, entity: &str) -> CliResult<String> {
        if self.engine.models().get(entity).is_none() {
            return Err(crate::error::CliError::UnknownEntity(entity.to_string()));
        }
        self.entity = entity.to_string();

        Ok(format!("entity is now {entity}"))
    }

    fn describe(&self) -> CliResult<String> {
        let model = self
            .engine
            .models()
            .get(&self.entity)
            .ok_or_else(|| crate::error::CliError::UnknownEntity(self.entity.clone()))?;

        output::entity(&model, self.format)
    }
}
