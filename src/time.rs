#[macro_export]
macro_rules! timed {
	($label:expr, $code:block) => {{
		let start = ::std::time::Instant::now();
		let result = { $code };
		println!("📊 {}: {:?}", $label, start.elapsed());
		result
	}};
}
