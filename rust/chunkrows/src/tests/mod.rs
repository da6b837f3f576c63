


#[cfg(test)]
mod exhaustion;
